use crate::touch::ContactFrame;

use super::inertia::InertiaState;
use super::motion::MotionShaper;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GesturePhase {
    #[default]
    Idle,
    Active,
    CancellationPending,
    Coasting,
}

impl GesturePhase {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Active => "active",
            Self::CancellationPending => "cancel_pending",
            Self::Coasting => "coasting",
        }
    }
}

/// Milliseconds from `since` to `now`; a missing timestamp is infinitely old.
pub(crate) fn elapsed_ms(since: Option<u64>, now_ms: u64) -> u64 {
    since.map_or(u64::MAX, |t| now_ms.saturating_sub(t))
}

/// Shared record mutated by every processing cycle and by the periodic
/// loops. Lives as the storage of the gesture state machine.
#[derive(Debug, Default)]
pub(super) struct GestureContext {
    pub(crate) phase: GesturePhase,

    pub(crate) gesture_started: bool,
    pub(crate) cancellation_started: bool,
    pub(crate) inertia_active: bool,
    pub(crate) dragging: bool,

    pub(crate) last_event: Option<u64>,
    pub(crate) last_valid_movement: Option<u64>,
    pub(crate) cancellation_time: Option<u64>,
    pub(crate) last_one_finger_switch: Option<u64>,
    pub(crate) gesture_start: Option<u64>,
    pub(crate) first_touch: Option<u64>,
    pub(crate) finger_transition_start: Option<u64>,

    pub(crate) last_contact_count: usize,
    pub(crate) previous_contacts: ContactFrame,

    pub(crate) motion: MotionShaper,
    pub(crate) inertia: InertiaState,
}

/// Read-only view of the context for logging and tests.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GestureSnapshot {
    pub phase: GesturePhase,
    pub gesture_started: bool,
    pub cancellation_started: bool,
    pub inertia_active: bool,
    pub dragging: bool,
    pub last_event: Option<u64>,
    pub last_valid_movement: Option<u64>,
    pub cancellation_time: Option<u64>,
    pub last_contact_count: usize,
    pub velocity: (f64, f64),
}

impl GestureContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> GestureSnapshot {
        GestureSnapshot {
            phase: self.phase,
            gesture_started: self.gesture_started,
            cancellation_started: self.cancellation_started,
            inertia_active: self.inertia_active,
            dragging: self.dragging,
            last_event: self.last_event,
            last_valid_movement: self.last_valid_movement,
            cancellation_time: self.cancellation_time,
            last_contact_count: self.last_contact_count,
            velocity: (self.inertia.vx, self.inertia.vy),
        }
    }

    /// Bookkeeping done after every classified frame, whatever the handler
    /// decided.
    pub(crate) fn commit_frame(&mut self, now_ms: u64, current: &ContactFrame) {
        let count = current.contact_count();
        if self.last_contact_count == 0 && count > 0 {
            self.first_touch = Some(now_ms);
        }
        self.previous_contacts = current.clone();
        self.last_event = Some(now_ms);
        self.last_contact_count = count;
    }
}
