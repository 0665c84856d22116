use std::sync::Arc;

use parking_lot::RwLock;

pub mod file;

pub use file::{load_tunables, save_tunables, ConfigError, TunablesFile};

pub const DEFAULT_GESTURE_SPEED_PERCENT: u16 = 100;
pub const DEFAULT_CANCELLATION_DELAY_MS: u32 = 500;
pub const DEFAULT_AUTOMATIC_TIMEOUT_DELAY_MS: u32 = 1_000;
pub const DEFAULT_ONE_FINGER_TRANSITION_DELAY_MS: u32 = 100;
pub const DEFAULT_ACTIVATION_THRESHOLD_MS: u32 = 150;

const MAX_GESTURE_SPEED_PERCENT: u16 = 1_000;
/// Friction of 1.0 would never decay the coasting velocity.
pub const MAX_INERTIA_FRICTION: f64 = 0.9999;

/// User-adjustable gesture parameters. Read fresh for every dispatched event.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tunables {
    pub gesture_speed_percent: u16,
    pub cancellation_delay_ms: u32,
    pub automatic_timeout_delay_ms: u32,
    pub one_finger_transition_delay_ms: u32,
    pub cancel_on_finger_count_change: bool,
    pub activation_threshold_enabled: bool,
    pub activation_threshold_ms: u32,
    pub inertia_enabled: bool,
    /// px/s
    pub min_flick_velocity: f64,
    pub min_flick_distance_px: f64,
    pub max_flick_timespan_s: f64,
    pub inertia_friction_start: f64,
    pub inertia_friction_end: f64,
    pub inertia_speed_multiplier: f64,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            gesture_speed_percent: DEFAULT_GESTURE_SPEED_PERCENT,
            cancellation_delay_ms: DEFAULT_CANCELLATION_DELAY_MS,
            automatic_timeout_delay_ms: DEFAULT_AUTOMATIC_TIMEOUT_DELAY_MS,
            one_finger_transition_delay_ms: DEFAULT_ONE_FINGER_TRANSITION_DELAY_MS,
            cancel_on_finger_count_change: false,
            activation_threshold_enabled: false,
            activation_threshold_ms: DEFAULT_ACTIVATION_THRESHOLD_MS,
            inertia_enabled: true,
            min_flick_velocity: 300.0,
            min_flick_distance_px: 50.0,
            max_flick_timespan_s: 0.2,
            inertia_friction_start: 0.9985,
            inertia_friction_end: 0.992,
            inertia_speed_multiplier: 2.0,
        }
    }
}

impl Tunables {
    /// Clamps values into ranges the engine can work with. Non-finite floats
    /// fall back to their defaults.
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        let finite_or = |value: f64, fallback: f64| if value.is_finite() { value } else { fallback };

        Self {
            gesture_speed_percent: self.gesture_speed_percent.min(MAX_GESTURE_SPEED_PERCENT),
            min_flick_velocity: finite_or(self.min_flick_velocity, defaults.min_flick_velocity)
                .max(0.0),
            min_flick_distance_px: finite_or(
                self.min_flick_distance_px,
                defaults.min_flick_distance_px,
            )
            .max(0.0),
            max_flick_timespan_s: finite_or(
                self.max_flick_timespan_s,
                defaults.max_flick_timespan_s,
            )
            .max(0.0),
            inertia_friction_start: finite_or(
                self.inertia_friction_start,
                defaults.inertia_friction_start,
            )
            .clamp(0.0, MAX_INERTIA_FRICTION),
            inertia_friction_end: finite_or(
                self.inertia_friction_end,
                defaults.inertia_friction_end,
            )
            .clamp(0.0, MAX_INERTIA_FRICTION),
            inertia_speed_multiplier: finite_or(
                self.inertia_speed_multiplier,
                defaults.inertia_speed_multiplier,
            )
            .max(0.0),
            ..self
        }
    }
}

/// Where the engine reads its tunables from.
pub trait TunablesSource: Send + Sync {
    fn current(&self) -> Tunables;

    /// Re-reads the backing store. Returns `true` when the value changed.
    fn refresh(&self) -> bool {
        false
    }
}

impl TunablesSource for Tunables {
    fn current(&self) -> Tunables {
        *self
    }
}

/// In-memory tunables updated by whoever holds a clone.
#[derive(Clone, Debug, Default)]
pub struct LiveTunables {
    inner: Arc<RwLock<Tunables>>,
}

impl LiveTunables {
    pub fn new(tunables: Tunables) -> Self {
        Self {
            inner: Arc::new(RwLock::new(tunables.sanitized())),
        }
    }

    pub fn set(&self, tunables: Tunables) {
        *self.inner.write() = tunables.sanitized();
    }

    pub fn update(&self, edit: impl FnOnce(&mut Tunables)) {
        let mut guard = self.inner.write();
        edit(&mut *guard);
        *guard = guard.sanitized();
    }
}

impl TunablesSource for LiveTunables {
    fn current(&self) -> Tunables {
        *self.inner.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitized_clamps_out_of_range_values() {
        let wild = Tunables {
            gesture_speed_percent: 5_000,
            inertia_friction_start: 1.7,
            inertia_friction_end: f64::NAN,
            min_flick_distance_px: -4.0,
            ..Tunables::default()
        };
        let clean = wild.sanitized();

        assert_eq!(clean.gesture_speed_percent, MAX_GESTURE_SPEED_PERCENT);
        assert_eq!(clean.inertia_friction_start, MAX_INERTIA_FRICTION);
        assert_eq!(clean.inertia_friction_end, Tunables::default().inertia_friction_end);
        assert_eq!(clean.min_flick_distance_px, 0.0);
        assert_eq!(clean.cancellation_delay_ms, DEFAULT_CANCELLATION_DELAY_MS);
    }

    #[test]
    fn live_tunables_are_shared_between_clones() {
        let live = LiveTunables::new(Tunables::default());
        let reader = live.clone();

        live.update(|t| t.gesture_speed_percent = 40);
        assert_eq!(reader.current().gesture_speed_percent, 40);

        live.set(Tunables {
            inertia_enabled: false,
            ..Tunables::default()
        });
        assert!(!reader.current().inertia_enabled);
        assert_eq!(reader.current().gesture_speed_percent, 100);
    }
}
