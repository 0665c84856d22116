mod context;
pub mod engine;
mod hsm;
pub mod inertia;
pub mod machine;
pub mod motion;

pub use context::{GesturePhase, GestureSnapshot};
pub use engine::GestureEngine;
pub use inertia::{FlickEstimate, InertiaState, InertiaStep};
pub use machine::GestureMachine;
pub use motion::{AppliedMotion, MotionShaper, MotionTally};

/// A slot whose last counted movement is older than this is skipped once.
pub const INACTIVITY_THRESHOLD_MS: u64 = 100;
/// Settle window after gesture start, and the staleness limit between frames.
pub const GESTURE_START_THRESHOLD_MS: u64 = 50;
/// Continuous under-count required before a count change begins cancellation.
pub const FINGER_LIFT_TRANSITION_MS: u64 = 50;
pub const FINGER_HISTORY_LEN: usize = 6;

/// Per-second decay of flick sample weights.
pub const FLICK_RECENCY_DECAY: f64 = 5.0;
pub const FLICK_AMPLIFICATION: f64 = 1.5;
/// px/s
pub const INERTIA_REFERENCE_MAX_SPEED: f64 = 3_000.0;
/// px/s
pub const INERTIA_STOP_SPEED: f64 = 5.0;
pub const INERTIA_TICK_US: u64 = 500;
/// Coasting is stopped by the failsafe after this long.
pub const MAX_COAST_MS: u64 = 5_000;

pub const FAILSAFE_PERIOD_MS: u64 = 50;
