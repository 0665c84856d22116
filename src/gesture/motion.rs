use heapless::{Deque, LinearMap};

use crate::touch::{ContactFrame, ContactId, MAX_CONTACT_SLOTS};

use super::context::elapsed_ms;
use super::{FINGER_HISTORY_LEN, INACTIVITY_THRESHOLD_MS};

/// One counted movement of a finger, kept for flick estimation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HistorySample {
    pub dx: f64,
    pub dy: f64,
    pub t_ms: u64,
}

pub type FingerHistory = Deque<HistorySample, FINGER_HISTORY_LEN>;

#[derive(Clone, Copy, Debug, Default)]
struct SlotAccumulator {
    dx: i32,
    dy: i32,
    movement_time: Option<u64>,
}

impl SlotAccumulator {
    fn reset(&mut self) {
        *self = Self::default();
    }

    fn magnitude(&self) -> i64 {
        i64::from(self.dx).abs() + i64::from(self.dy).abs()
    }
}

/// Result of folding one frame pair into the accumulators.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MotionTally {
    /// Slots that matched identity and were recently active.
    pub live: usize,
    /// Slots that contributed a counted movement.
    pub valid: usize,
}

/// Speed-scaled pointer displacement for one cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AppliedMotion {
    pub dx: i32,
    pub dy: i32,
    /// `|dx| + |dy| >= 1` before truncation.
    pub significant: bool,
}

impl AppliedMotion {
    pub fn is_zero(&self) -> bool {
        self.dx == 0 && self.dy == 0
    }
}

#[derive(Debug, Default)]
pub struct MotionShaper {
    slots: [SlotAccumulator; MAX_CONTACT_SLOTS],
    history: LinearMap<ContactId, FingerHistory, MAX_CONTACT_SLOTS>,
}

impl MotionShaper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compares `current` against `previous` slot by slot and accumulates
    /// raw deltas.
    pub fn accumulate(
        &mut self,
        now_ms: u64,
        current: &ContactFrame,
        previous: &ContactFrame,
    ) -> MotionTally {
        self.forget_lifted(current);

        let mut tally = MotionTally::default();
        let pairs = current.contacts().iter().zip(previous.contacts());
        for (slot, (now, before)) in self.slots.iter_mut().zip(pairs) {
            if !now.on_surface || !before.on_surface || now.id != before.id {
                slot.reset();
                continue;
            }

            let since = elapsed_ms(slot.movement_time, now_ms);
            slot.movement_time = Some(now_ms);
            if since > INACTIVITY_THRESHOLD_MS {
                continue;
            }
            tally.live += 1;

            let dx = now.x.saturating_sub(before.x);
            let dy = now.y.saturating_sub(before.y);
            if dx == 0 && dy == 0 {
                continue;
            }
            slot.dx = slot.dx.saturating_add(dx);
            slot.dy = slot.dy.saturating_add(dy);
            if slot.magnitude() < 1 {
                continue;
            }

            tally.valid += 1;
            push_sample(
                &mut self.history,
                now.id,
                HistorySample {
                    dx: f64::from(dx),
                    dy: f64::from(dy),
                    t_ms: now_ms,
                },
            );
        }
        tally
    }

    /// Sums the accumulators, scales them by `speed_percent` and clears the
    /// axes that produced at least one whole pixel.
    pub fn apply(&mut self, speed_percent: u16) -> AppliedMotion {
        let scale = f64::from(speed_percent) / 100.0;
        let sum_x: i64 = self.slots.iter().map(|s| i64::from(s.dx)).sum();
        let sum_y: i64 = self.slots.iter().map(|s| i64::from(s.dy)).sum();
        let delta_x = sum_x as f64 * scale;
        let delta_y = sum_y as f64 * scale;

        let change_x = delta_x.abs();
        let change_y = delta_y.abs();
        if change_x >= 1.0 {
            self.slots.iter_mut().for_each(|s| s.dx = 0);
        }
        if change_y >= 1.0 {
            self.slots.iter_mut().for_each(|s| s.dy = 0);
        }

        AppliedMotion {
            dx: delta_x.trunc() as i32,
            dy: delta_y.trunc() as i32,
            significant: change_x + change_y >= 1.0,
        }
    }

    /// Zeroes accumulated deltas; movement times are kept.
    pub fn clear_accumulators(&mut self) {
        for slot in self.slots.iter_mut() {
            slot.dx = 0;
            slot.dy = 0;
        }
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn history(&self, id: ContactId) -> Option<&FingerHistory> {
        self.history.get(&id)
    }

    pub fn accumulated(&self) -> (i64, i64) {
        let x = self.slots.iter().map(|s| i64::from(s.dx)).sum();
        let y = self.slots.iter().map(|s| i64::from(s.dy)).sum();
        (x, y)
    }

    fn forget_lifted(&mut self, current: &ContactFrame) {
        let mut stale: heapless::Vec<ContactId, MAX_CONTACT_SLOTS> = heapless::Vec::new();
        for id in self.history.keys() {
            if !current.get(*id).is_some_and(|c| c.on_surface) {
                let _ = stale.push(*id);
            }
        }
        for id in stale {
            self.history.remove(&id);
        }
    }
}

fn push_sample(
    history: &mut LinearMap<ContactId, FingerHistory, MAX_CONTACT_SLOTS>,
    id: ContactId,
    sample: HistorySample,
) {
    if let Some(samples) = history.get_mut(&id) {
        if samples.is_full() {
            samples.pop_front();
        }
        let _ = samples.push_back(sample);
        return;
    }

    let mut samples = FingerHistory::new();
    let _ = samples.push_back(sample);
    if history.insert(id, samples).is_err() {
        log::debug!("motion: history_full drop id={}", id);
    }
}
