pub mod classify;
pub mod tracker;
pub mod types;

pub use classify::{classify, dispatch, FrameEvent, FrameHandler, FrameKind};
pub use tracker::ContactTracker;
pub use types::{
    AxisBounds, Contact, ContactFrame, ContactId, MAX_CONTACT_ID, MAX_CONTACT_SLOTS,
    REQUIRED_CONTACT_COUNT,
};
