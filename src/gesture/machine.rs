use statig::blocking::IntoStateMachineExt as _;

use crate::config::Tunables;
use crate::io::EngineOutput;
use crate::touch::{self, ContactFrame, FrameEvent, FrameHandler};

use super::context::{GestureContext, GesturePhase, GestureSnapshot};
use super::hsm::{DispatchContext, GestureHsmEvent};

/// Gesture state machine, including cancellation and coasting.
pub struct GestureMachine {
    machine: statig::blocking::StateMachine<GestureContext>,
}

impl Default for GestureMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl GestureMachine {
    pub fn new() -> Self {
        Self {
            machine: GestureContext::new().state_machine(),
        }
    }

    /// Classifies `frame`, runs the matching handler, then commits the frame
    /// as the new previous frame.
    pub fn handle_frame(&mut self, frame: &FrameEvent, tunables: &Tunables) -> EngineOutput {
        let output = touch::dispatch(
            &mut FrameDispatch {
                machine: self,
                tunables,
            },
            frame,
        );
        let _ = self.dispatch(GestureHsmEvent::Commit(frame.clone()), tunables);
        output
    }

    pub fn failsafe(&mut self, now_ms: u64, tunables: &Tunables) -> EngineOutput {
        self.dispatch(GestureHsmEvent::Failsafe { now_ms }, tunables)
    }

    pub fn inertia_tick(&mut self, tunables: &Tunables) -> EngineOutput {
        self.dispatch(GestureHsmEvent::InertiaTick, tunables)
    }

    pub fn phase(&self) -> GesturePhase {
        self.machine.inner().phase
    }

    pub fn snapshot(&self) -> GestureSnapshot {
        self.machine.inner().snapshot()
    }

    pub fn previous_contacts(&self) -> &ContactFrame {
        &self.machine.inner().previous_contacts
    }

    fn dispatch(&mut self, event: GestureHsmEvent, tunables: &Tunables) -> EngineOutput {
        let mut context = DispatchContext::new(*tunables);
        self.machine.handle_with_context(&event, &mut context);
        context.finish()
    }
}

struct FrameDispatch<'a> {
    machine: &'a mut GestureMachine,
    tunables: &'a Tunables,
}

impl FrameHandler for FrameDispatch<'_> {
    type Output = EngineOutput;

    fn on_activity(&mut self, event: &FrameEvent) -> EngineOutput {
        self.machine
            .dispatch(GestureHsmEvent::Activity(event.clone()), self.tunables)
    }

    fn on_release(&mut self, event: &FrameEvent) -> EngineOutput {
        self.machine
            .dispatch(GestureHsmEvent::Release(event.clone()), self.tunables)
    }
}
