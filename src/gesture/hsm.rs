use statig::prelude::*;

use crate::config::Tunables;
use crate::io::{EngineOutput, PointerCommand};
use crate::touch::{ContactFrame, FrameEvent, REQUIRED_CONTACT_COUNT};

use super::context::{elapsed_ms, GestureContext, GesturePhase};
use super::inertia::{FlickEstimate, InertiaStep};
use super::{FINGER_LIFT_TRANSITION_MS, GESTURE_START_THRESHOLD_MS, MAX_COAST_MS};

#[derive(Clone, Debug)]
pub(super) enum GestureHsmEvent {
    Activity(FrameEvent),
    Release(FrameEvent),
    /// Frame bookkeeping, sent after every Activity or Release.
    Commit(FrameEvent),
    Failsafe { now_ms: u64 },
    InertiaTick,
}

#[derive(Debug)]
pub(super) struct DispatchContext {
    pub(super) tunables: Tunables,
    output: EngineOutput,
}

impl DispatchContext {
    pub(super) fn new(tunables: Tunables) -> Self {
        Self {
            tunables,
            output: EngineOutput::default(),
        }
    }

    fn emit(&mut self, command: PointerCommand) {
        if self.output.commands.push(command).is_err() {
            log::warn!("gesture: output_full drop kind={}", command.kind());
        }
    }

    pub(super) fn finish(self) -> EngineOutput {
        self.output
    }
}

#[state_machine(initial = "State::idle()")]
impl GestureContext {
    #[state(superstate = "session")]
    fn idle(&mut self, context: &mut DispatchContext, event: &GestureHsmEvent) -> Outcome<State> {
        match event {
            GestureHsmEvent::Activity(frame) => {
                if self.dragging || self.gesture_started || !frame.can_start_gesture() {
                    return Handled;
                }
                if !self.activation_window_open(&context.tunables, frame.now_ms) {
                    log::trace!("gesture: activation_late t={}", frame.now_ms);
                    return Handled;
                }
                self.start_gesture(frame.now_ms);
                Transition(State::active())
            }
            _ => Super,
        }
    }

    #[state(superstate = "session")]
    fn active(&mut self, context: &mut DispatchContext, event: &GestureHsmEvent) -> Outcome<State> {
        match event {
            GestureHsmEvent::Activity(frame) => self.drive(context, frame),
            GestureHsmEvent::Release(frame) => self.begin_cancellation(context, frame.now_ms),
            GestureHsmEvent::Failsafe { now_ms } => {
                let quiet_ms = elapsed_ms(self.last_event, *now_ms);
                if quiet_ms > u64::from(context.tunables.automatic_timeout_delay_ms) {
                    self.cancel_gesture(context, *now_ms, "timeout");
                    self.forget_contacts();
                    return Transition(State::idle());
                }
                Handled
            }
            _ => Super,
        }
    }

    #[state(superstate = "session")]
    fn cancellation_pending(
        &mut self,
        context: &mut DispatchContext,
        event: &GestureHsmEvent,
    ) -> Outcome<State> {
        match event {
            GestureHsmEvent::Activity(frame) => self.drive(context, frame),
            GestureHsmEvent::Release(_) => Handled,
            GestureHsmEvent::Failsafe { now_ms } => {
                let still_ms = elapsed_ms(self.last_valid_movement, *now_ms);
                if still_ms >= u64::from(context.tunables.cancellation_delay_ms) {
                    self.cancel_gesture(context, *now_ms, "delay_elapsed");
                    return Transition(State::idle());
                }
                Handled
            }
            _ => Super,
        }
    }

    #[state(superstate = "session")]
    fn coasting(&mut self, context: &mut DispatchContext, event: &GestureHsmEvent) -> Outcome<State> {
        match event {
            GestureHsmEvent::InertiaTick => match self.inertia.step(&context.tunables) {
                InertiaStep::Move { dx, dy } => {
                    context.emit(PointerCommand::Move { dx, dy });
                    Handled
                }
                InertiaStep::Hold => Handled,
                InertiaStep::Stopped => {
                    self.stop_inertia(context, "decayed");
                    Transition(State::idle())
                }
            },
            GestureHsmEvent::Activity(frame) => {
                if frame.contact_count() > self.last_contact_count {
                    self.stop_inertia(context, "touch");
                    return Transition(State::idle());
                }
                Handled
            }
            GestureHsmEvent::Failsafe { now_ms } => {
                if elapsed_ms(self.inertia.started_at, *now_ms) > MAX_COAST_MS {
                    self.stop_inertia(context, "expired");
                    return Transition(State::idle());
                }
                Handled
            }
            _ => Super,
        }
    }

    #[superstate]
    fn session(&mut self, event: &GestureHsmEvent) -> Outcome<State> {
        match event {
            GestureHsmEvent::Commit(frame) => {
                self.commit_frame(frame.now_ms, &frame.current);
                Handled
            }
            _ => Handled,
        }
    }
}

impl GestureContext {
    fn activation_window_open(&self, tunables: &Tunables, now_ms: u64) -> bool {
        if !tunables.activation_threshold_enabled {
            return true;
        }
        let touch_start = if self.last_contact_count == 0 {
            Some(now_ms)
        } else {
            self.first_touch
        };
        elapsed_ms(touch_start, now_ms) <= u64::from(tunables.activation_threshold_ms)
    }

    fn start_gesture(&mut self, now_ms: u64) {
        self.gesture_started = true;
        self.cancellation_started = false;
        self.cancellation_time = None;
        self.finger_transition_start = None;
        self.gesture_start = Some(now_ms);
        self.motion.clear_accumulators();
        self.motion.clear_history();
        self.phase = GesturePhase::Active;
        log::debug!("gesture: start t={}", now_ms);
    }

    /// Shared Activity path of `active` and `cancellation_pending`.
    fn drive(&mut self, context: &mut DispatchContext, frame: &FrameEvent) -> Outcome<State> {
        let now_ms = frame.now_ms;
        let tunables = context.tunables;

        if frame.previous.is_empty() {
            return Handled;
        }
        if elapsed_ms(self.last_event, now_ms) > GESTURE_START_THRESHOLD_MS {
            return Handled;
        }
        if elapsed_ms(self.gesture_start, now_ms) <= GESTURE_START_THRESHOLD_MS {
            return Handled;
        }
        if !frame.can_start_gesture() && !self.dragging {
            return Handled;
        }

        if !self.cancellation_started {
            if let Some(estimate) = self.detect_flick(&tunables, frame) {
                self.launch_inertia(&tunables, estimate, now_ms);
                return Transition(State::coasting());
            }
        }

        let tally = self.motion.accumulate(now_ms, &frame.current, &frame.previous);

        if self.cancellation_started && !frame.can_start_gesture() && tally.live > 0 {
            self.cancel_gesture(context, now_ms, "reduced_fingers");
            return Transition(State::idle());
        }

        if tunables.cancel_on_finger_count_change && !self.cancellation_started && self.dragging {
            if !frame.can_start_gesture() {
                let since = *self.finger_transition_start.get_or_insert(now_ms);
                if now_ms.saturating_sub(since) > FINGER_LIFT_TRANSITION_MS {
                    self.finger_transition_start = None;
                    return self.begin_cancellation(context, now_ms);
                }
            } else {
                self.finger_transition_start = None;
            }
        }

        let count = frame.contact_count();
        if count == 1 && self.last_contact_count == 1 {
            let carried_ms = elapsed_ms(self.last_one_finger_switch, now_ms);
            if carried_ms > u64::from(tunables.one_finger_transition_delay_ms) {
                self.motion.clear_accumulators();
                return Handled;
            }
        }
        if self.gesture_started && self.last_contact_count > 1 && count == 1 {
            self.last_one_finger_switch = Some(now_ms);
        }

        if tally.valid == 0 {
            return Handled;
        }

        let applied = self.motion.apply(tunables.gesture_speed_percent);
        if !self.dragging {
            self.dragging = true;
            context.emit(PointerCommand::ButtonDown);
            log::debug!("gesture: drag_start t={}", now_ms);
        }
        if !applied.is_zero() {
            context.emit(PointerCommand::Move {
                dx: applied.dx,
                dy: applied.dy,
            });
        }
        if applied.significant {
            self.last_valid_movement = Some(now_ms);
        }

        if self.cancellation_started {
            self.cancellation_started = false;
            self.cancellation_time = None;
            self.phase = GesturePhase::Active;
            log::debug!("gesture: cancel_aborted t={}", now_ms);
            return Transition(State::active());
        }
        Handled
    }

    fn detect_flick(&self, tunables: &Tunables, frame: &FrameEvent) -> Option<FlickEstimate> {
        if !tunables.inertia_enabled || !self.dragging {
            return None;
        }
        if frame.previous_count() != REQUIRED_CONTACT_COUNT
            || frame.contact_count() != REQUIRED_CONTACT_COUNT - 1
        {
            return None;
        }

        let released = frame.previous.released_in(&frame.current).next()?;
        let history = self.motion.history(released)?;
        let estimate = FlickEstimate::from_history(history, frame.now_ms)?;
        if !estimate.qualifies(tunables) {
            log::trace!(
                "gesture: flick_rejected id={} speed={:.0} distance={:.0} span_s={:.3}",
                released,
                estimate.speed,
                estimate.distance,
                estimate.span_s
            );
            return None;
        }
        Some(estimate)
    }

    fn launch_inertia(&mut self, tunables: &Tunables, estimate: FlickEstimate, now_ms: u64) {
        let velocity = estimate.launch_velocity(tunables);
        self.inertia.launch(velocity, now_ms);
        self.inertia_active = true;
        self.gesture_started = false;
        self.cancellation_started = false;
        self.cancellation_time = None;
        self.finger_transition_start = None;
        self.motion.clear_accumulators();
        self.motion.clear_history();
        self.phase = GesturePhase::Coasting;
        log::debug!(
            "gesture: flick t={} vx={:.0} vy={:.0}",
            now_ms,
            velocity.0,
            velocity.1
        );
    }

    fn stop_inertia(&mut self, context: &mut DispatchContext, reason: &str) {
        self.inertia.reset();
        self.inertia_active = false;
        self.release_button(context);
        self.phase = GesturePhase::Idle;
        log::debug!("gesture: coast_end reason={}", reason);
    }

    /// Cancels right away when the fingers have been still for at least the
    /// cancellation delay, otherwise arms the pending cancellation.
    fn begin_cancellation(&mut self, context: &mut DispatchContext, now_ms: u64) -> Outcome<State> {
        let still_ms = elapsed_ms(self.last_valid_movement, now_ms);
        if still_ms >= u64::from(context.tunables.cancellation_delay_ms) {
            self.cancel_gesture(context, now_ms, "still");
            return Transition(State::idle());
        }

        self.cancellation_started = true;
        self.cancellation_time = Some(now_ms);
        self.last_valid_movement = Some(now_ms);
        self.phase = GesturePhase::CancellationPending;
        log::debug!("gesture: cancel_pending t={}", now_ms);
        Transition(State::cancellation_pending())
    }

    fn cancel_gesture(&mut self, context: &mut DispatchContext, now_ms: u64, reason: &str) {
        self.release_button(context);
        self.gesture_started = false;
        self.cancellation_started = false;
        self.cancellation_time = None;
        self.finger_transition_start = None;
        self.motion.clear_accumulators();
        self.motion.clear_history();
        self.phase = GesturePhase::Idle;
        log::debug!("gesture: cancel reason={} t={}", reason, now_ms);
    }

    /// Drops the remembered frame after a timeout, when the final lift
    /// report may never arrive.
    fn forget_contacts(&mut self) {
        self.previous_contacts = ContactFrame::new();
        self.last_contact_count = 0;
        self.first_touch = None;
    }

    fn release_button(&mut self, context: &mut DispatchContext) {
        if self.dragging {
            self.dragging = false;
            context.emit(PointerCommand::ButtonUp);
        }
    }
}
