/// Maximum number of simultaneously tracked contacts (and motion slots).
pub const MAX_CONTACT_SLOTS: usize = 10;
/// Highest contact id the surface is allowed to report.
pub const MAX_CONTACT_ID: u32 = 63;
/// Number of fingers that make up the drag gesture.
pub const REQUIRED_CONTACT_COUNT: usize = 3;

pub type ContactId = u32;

/// Logical coordinate range reported by the surface for one contact.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AxisBounds {
    pub min_x: i32,
    pub max_x: i32,
    pub min_y: i32,
    pub max_y: i32,
}

impl AxisBounds {
    pub fn contains(&self, x: i32, y: i32) -> bool {
        (self.min_x..=self.max_x).contains(&x) && (self.min_y..=self.max_y).contains(&y)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Contact {
    pub id: ContactId,
    pub x: i32,
    pub y: i32,
    pub on_surface: bool,
    pub bounds: Option<AxisBounds>,
}

impl Contact {
    pub const fn new(id: ContactId, x: i32, y: i32, on_surface: bool) -> Self {
        Self {
            id,
            x,
            y,
            on_surface,
            bounds: None,
        }
    }

    pub const fn with_bounds(mut self, bounds: AxisBounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// Sensor-side validity: id range, the zero-coordinate sentinel and the
    /// reported logical bounds.
    pub fn is_valid(&self) -> bool {
        if self.id > MAX_CONTACT_ID {
            return false;
        }
        if self.x == 0 || self.y == 0 {
            return false;
        }
        self.bounds.is_none_or(|bounds| bounds.contains(self.x, self.y))
    }
}

/// Contacts observed in one processing cycle, ordered by id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContactFrame {
    contacts: heapless::Vec<Contact, MAX_CONTACT_SLOTS>,
}

impl ContactFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a frame from arbitrary contacts. Later duplicates of an id win,
    /// contacts beyond capacity are dropped.
    pub fn from_contacts(contacts: &[Contact]) -> Self {
        let mut frame = Self::new();
        for contact in contacts {
            frame.upsert(*contact);
        }
        frame
    }

    pub(crate) fn upsert(&mut self, contact: Contact) -> bool {
        if let Some(existing) = self.contacts.iter_mut().find(|c| c.id == contact.id) {
            *existing = contact;
            return true;
        }
        if self.contacts.push(contact).is_err() {
            return false;
        }
        self.contacts.sort_unstable_by_key(|c| c.id);
        true
    }

    pub(crate) fn retain_on_surface(&mut self) {
        self.contacts.retain(|c| c.on_surface);
    }

    pub(crate) fn lift_all(&mut self) {
        for contact in self.contacts.iter_mut() {
            contact.on_surface = false;
        }
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn get(&self, id: ContactId) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.id == id)
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    pub fn contact_count(&self) -> usize {
        self.contacts.iter().filter(|c| c.on_surface).count()
    }

    pub fn can_start_gesture(&self) -> bool {
        self.contact_count() == REQUIRED_CONTACT_COUNT
    }

    /// Ids that were on the surface here but are lifted or gone in `next`.
    pub fn released_in<'a>(&'a self, next: &'a ContactFrame) -> impl Iterator<Item = ContactId> + 'a {
        self.contacts
            .iter()
            .filter(|c| c.on_surface)
            .filter(move |c| !next.get(c.id).is_some_and(|n| n.on_surface))
            .map(|c| c.id)
    }
}
