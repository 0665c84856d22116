use crate::config::Tunables;

use super::motion::FingerHistory;
use super::{
    FLICK_AMPLIFICATION, FLICK_RECENCY_DECAY, INACTIVITY_THRESHOLD_MS, INERTIA_REFERENCE_MAX_SPEED,
    INERTIA_STOP_SPEED, INERTIA_TICK_US,
};

/// Recency-weighted velocity of a finger at lift-off.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlickEstimate {
    pub vx: f64,
    pub vy: f64,
    /// px/s
    pub speed: f64,
    /// Length of the weighted displacement sum, px.
    pub distance: f64,
    pub span_s: f64,
}

impl FlickEstimate {
    /// Estimate for a finger released at `release_ms`.
    ///
    /// `None` for an empty history, a zero time span, non-finite math, or a
    /// finger that rested longer than the inactivity threshold before lifting.
    pub fn from_history(history: &FingerHistory, release_ms: u64) -> Option<Self> {
        let first = history.front()?;
        let last = history.back()?;
        if release_ms.saturating_sub(last.t_ms) > INACTIVITY_THRESHOLD_MS {
            return None;
        }
        let span_s = last.t_ms.saturating_sub(first.t_ms) as f64 / 1000.0;
        if span_s <= 0.0 {
            return None;
        }

        let mut sum_x = 0.0;
        let mut sum_y = 0.0;
        let mut weights = 0.0;
        for sample in history.iter() {
            let age_s = last.t_ms.saturating_sub(sample.t_ms) as f64 / 1000.0;
            let weight = (-age_s * FLICK_RECENCY_DECAY).exp();
            sum_x += sample.dx * weight;
            sum_y += sample.dy * weight;
            weights += weight;
        }
        if weights <= 0.0 {
            return None;
        }

        let vx = sum_x / weights / span_s;
        let vy = sum_y / weights / span_s;
        let estimate = Self {
            vx,
            vy,
            speed: vx.hypot(vy),
            distance: sum_x.hypot(sum_y),
            span_s,
        };
        estimate.is_finite().then_some(estimate)
    }

    pub fn qualifies(&self, tunables: &Tunables) -> bool {
        self.speed >= tunables.min_flick_velocity
            && self.distance >= tunables.min_flick_distance_px
            && self.span_s <= tunables.max_flick_timespan_s
    }

    /// Initial coasting velocity, amplified and then capped.
    pub fn launch_velocity(&self, tunables: &Tunables) -> (f64, f64) {
        let gain = FLICK_AMPLIFICATION.min(tunables.inertia_speed_multiplier.max(0.0));
        let (vx, vy) = (self.vx * gain, self.vy * gain);
        let speed = vx.hypot(vy);
        if speed > INERTIA_REFERENCE_MAX_SPEED {
            let scale = INERTIA_REFERENCE_MAX_SPEED / speed;
            (vx * scale, vy * scale)
        } else {
            (vx, vy)
        }
    }

    fn is_finite(&self) -> bool {
        self.vx.is_finite() && self.vy.is_finite() && self.distance.is_finite()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InertiaStep {
    /// Whole pixels to move this tick.
    Move { dx: i32, dy: i32 },
    /// Still coasting, nothing to emit yet.
    Hold,
    Stopped,
}

/// Coasting velocity and the sub-pixel remainder carried between ticks.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InertiaState {
    pub vx: f64,
    pub vy: f64,
    remainder_x: f64,
    remainder_y: f64,
    pub started_at: Option<u64>,
}

impl InertiaState {
    pub fn launch(&mut self, velocity: (f64, f64), now_ms: u64) {
        *self = Self {
            vx: velocity.0,
            vy: velocity.1,
            started_at: Some(now_ms),
            ..Self::default()
        };
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn speed(&self) -> f64 {
        self.vx.hypot(self.vy)
    }

    /// Friction is interpolated from `inertia_friction_start` at the
    /// reference speed towards `inertia_friction_end` as the pointer slows.
    pub fn friction(&self, tunables: &Tunables) -> f64 {
        let ratio = (self.speed() / INERTIA_REFERENCE_MAX_SPEED).clamp(0.0, 1.0);
        let t = 1.0 - ratio;
        tunables.inertia_friction_start
            + (tunables.inertia_friction_end - tunables.inertia_friction_start) * t
    }

    pub fn step(&mut self, tunables: &Tunables) -> InertiaStep {
        let friction = self.friction(tunables);
        self.vx *= friction;
        self.vy *= friction;
        if !self.speed().is_finite() || self.speed() < INERTIA_STOP_SPEED {
            return InertiaStep::Stopped;
        }

        let tick_s = INERTIA_TICK_US as f64 / 1_000_000.0;
        let travel_x = self.vx * tick_s + self.remainder_x;
        let travel_y = self.vy * tick_s + self.remainder_y;
        let dx = travel_x.trunc();
        let dy = travel_y.trunc();
        self.remainder_x = travel_x - dx;
        self.remainder_y = travel_y - dy;

        if dx == 0.0 && dy == 0.0 {
            InertiaStep::Hold
        } else {
            InertiaStep::Move {
                dx: dx as i32,
                dy: dy as i32,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::motion::HistorySample;
    use super::*;

    fn history(samples: &[(f64, f64, u64)]) -> FingerHistory {
        let mut history = FingerHistory::new();
        for &(dx, dy, t_ms) in samples {
            let _ = history.push_back(HistorySample { dx, dy, t_ms });
        }
        history
    }

    fn estimate(speed: f64, distance: f64, span_s: f64) -> FlickEstimate {
        FlickEstimate {
            vx: speed,
            vy: 0.0,
            speed,
            distance,
            span_s,
        }
    }

    #[test]
    fn gating_accepts_fast_long_recent_flick() {
        let tunables = Tunables::default();
        assert!(estimate(400.0, 80.0, 0.15).qualifies(&tunables));
        assert!(!estimate(400.0, 10.0, 0.15).qualifies(&tunables));
        assert!(!estimate(250.0, 80.0, 0.15).qualifies(&tunables));
        assert!(!estimate(400.0, 80.0, 0.25).qualifies(&tunables));
    }

    #[test]
    fn weighted_velocity_uses_recency_decay() {
        let estimate = FlickEstimate::from_history(&history(&[(30.0, 0.0, 0), (30.0, 0.0, 100)]), 110)
            .expect("estimate");
        let older = (-0.1_f64 * FLICK_RECENCY_DECAY).exp();

        assert!((estimate.span_s - 0.1).abs() < 1e-9);
        assert!((estimate.vx - 300.0).abs() < 1e-9);
        assert!(estimate.vy.abs() < 1e-9);
        assert!((estimate.distance - 30.0 * (1.0 + older)).abs() < 1e-9);
    }

    #[test]
    fn degenerate_history_is_rejected() {
        assert!(FlickEstimate::from_history(&FingerHistory::new(), 50).is_none());
        assert!(FlickEstimate::from_history(&history(&[(5.0, 5.0, 40)]), 50).is_none());
        assert!(
            FlickEstimate::from_history(&history(&[(5.0, 0.0, 40), (5.0, 0.0, 40)]), 50).is_none()
        );
    }

    #[test]
    fn rested_finger_has_no_flick() {
        let fast = history(&[(30.0, 0.0, 0), (30.0, 0.0, 50), (30.0, 0.0, 100)]);
        assert!(FlickEstimate::from_history(&fast, 100 + INACTIVITY_THRESHOLD_MS).is_some());
        assert!(FlickEstimate::from_history(&fast, 101 + INACTIVITY_THRESHOLD_MS).is_none());
        assert!(FlickEstimate::from_history(&fast, 620).is_none());
    }

    #[test]
    fn launch_velocity_is_amplified_and_capped() {
        let tunables = Tunables::default();
        let (vx, vy) = estimate(400.0, 80.0, 0.15).launch_velocity(&tunables);
        assert!((vx - 600.0).abs() < 1e-9);
        assert_eq!(vy, 0.0);

        let (vx, _) = estimate(2_500.0, 300.0, 0.1).launch_velocity(&tunables);
        assert!((vx - INERTIA_REFERENCE_MAX_SPEED).abs() < 1e-9);

        let gentle = Tunables {
            inertia_speed_multiplier: 1.2,
            ..Tunables::default()
        };
        let (vx, _) = estimate(400.0, 80.0, 0.15).launch_velocity(&gentle);
        assert!((vx - 480.0).abs() < 1e-9);
    }

    #[test]
    fn friction_tightens_as_speed_drops() {
        let tunables = Tunables::default();
        let mut state = InertiaState::default();
        state.launch((INERTIA_REFERENCE_MAX_SPEED, 0.0), 0);
        assert!((state.friction(&tunables) - tunables.inertia_friction_start).abs() < 1e-12);

        state.launch((0.0, 0.0), 0);
        assert!((state.friction(&tunables) - tunables.inertia_friction_end).abs() < 1e-12);
    }

    #[test]
    fn coasting_carries_fraction_and_stops() {
        let tunables = Tunables::default();
        let mut state = InertiaState::default();
        state.launch((1_000.0, 0.0), 0);

        let mut travelled = 0_i64;
        let mut ticks = 0;
        loop {
            match state.step(&tunables) {
                InertiaStep::Move { dx, dy } => {
                    assert_eq!(dy, 0);
                    assert!(dx > 0);
                    travelled += i64::from(dx);
                }
                InertiaStep::Hold => {}
                InertiaStep::Stopped => break,
            }
            ticks += 1;
            assert!(ticks < 100_000, "inertia never stopped");
        }

        assert!(state.speed() < INERTIA_STOP_SPEED);
        assert!(travelled > 0);
        assert!(travelled < 1_000);
    }
}
