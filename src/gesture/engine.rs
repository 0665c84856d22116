use crate::config::Tunables;
use crate::io::EngineOutput;
use crate::touch::{Contact, ContactTracker, FrameEvent};

use super::context::{GesturePhase, GestureSnapshot};
use super::machine::GestureMachine;

/// Contact tracking plus the gesture machine, driven by explicit timestamps.
#[derive(Default)]
pub struct GestureEngine {
    tracker: ContactTracker,
    machine: GestureMachine,
}

impl GestureEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// One processing cycle: merge the raw batch, classify, dispatch and
    /// prune lifted contacts.
    pub fn process_report(
        &mut self,
        now_ms: u64,
        batch: &[Contact],
        tunables: &Tunables,
    ) -> EngineOutput {
        let before = self.machine.phase();
        let current = self.tracker.merge(batch).clone();
        let frame = FrameEvent {
            now_ms,
            current,
            previous: self.machine.previous_contacts().clone(),
        };

        let output = self.machine.handle_frame(&frame, tunables);
        self.tracker.prune();
        self.log_phase_change(before, now_ms);
        output
    }

    /// Cancellation, automatic-timeout and coasting-limit checks.
    pub fn failsafe_tick(&mut self, now_ms: u64, tunables: &Tunables) -> EngineOutput {
        let before = self.machine.phase();
        let output = self.machine.failsafe(now_ms, tunables);
        if before == GesturePhase::Active && self.machine.phase() == GesturePhase::Idle {
            // Timed out: the lift report may never come.
            self.tracker.reset();
        }
        self.log_phase_change(before, now_ms);
        output
    }

    pub fn inertia_tick(&mut self, tunables: &Tunables) -> EngineOutput {
        self.machine.inertia_tick(tunables)
    }

    pub fn phase(&self) -> GesturePhase {
        self.machine.phase()
    }

    pub fn is_coasting(&self) -> bool {
        self.phase() == GesturePhase::Coasting
    }

    pub fn snapshot(&self) -> GestureSnapshot {
        self.machine.snapshot()
    }

    pub fn tracker(&self) -> &ContactTracker {
        &self.tracker
    }

    fn log_phase_change(&self, before: GesturePhase, now_ms: u64) {
        let after = self.machine.phase();
        if after != before {
            log::info!(
                "gesture: phase from={} to={} t={}",
                before.as_str(),
                after.as_str(),
                now_ms
            );
        }
    }
}
