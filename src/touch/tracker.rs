use super::types::{Contact, ContactFrame};

/// Identity-keyed contact table fed by raw surface reports.
#[derive(Debug, Default)]
pub struct ContactTracker {
    table: ContactFrame,
    dropped_invalid: u32,
    dropped_overflow: u32,
}

impl ContactTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one report into the table and returns the resulting frame.
    ///
    /// Contacts missing from a non-empty batch keep their last state so
    /// partial reports do not look like lifts. An empty batch means every
    /// finger left the surface.
    pub fn merge(&mut self, batch: &[Contact]) -> &ContactFrame {
        if batch.is_empty() {
            self.table.lift_all();
            return &self.table;
        }

        for contact in batch {
            if !contact.is_valid() {
                self.dropped_invalid = self.dropped_invalid.saturating_add(1);
                log::trace!(
                    "touch: drop_invalid id={} x={} y={}",
                    contact.id,
                    contact.x,
                    contact.y
                );
                continue;
            }
            if !self.table.upsert(*contact) {
                self.dropped_overflow = self.dropped_overflow.saturating_add(1);
                log::debug!("touch: table_full drop id={}", contact.id);
            }
        }
        &self.table
    }

    /// Forgets contacts that reported a lift; they only live for the cycle
    /// that observed the transition.
    pub fn prune(&mut self) {
        self.table.retain_on_surface();
    }

    pub fn frame(&self) -> &ContactFrame {
        &self.table
    }

    pub fn reset(&mut self) {
        self.table = ContactFrame::new();
    }

    pub fn dropped_invalid(&self) -> u32 {
        self.dropped_invalid
    }

    pub fn dropped_overflow(&self) -> u32 {
        self.dropped_overflow
    }
}

#[cfg(test)]
mod tests;
