use std::sync::Arc;

use parking_lot::Mutex;

/// Upper bound of pointer commands a single dispatch can produce.
pub const MAX_COMMANDS_PER_DISPATCH: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerCommand {
    Move { dx: i32, dy: i32 },
    ButtonDown,
    ButtonUp,
}

impl PointerCommand {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Move { .. } => "move",
            Self::ButtonDown => "down",
            Self::ButtonUp => "up",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CursorError {
    #[error("pointer device unavailable")]
    Unavailable,
    #[error("pointer injection failed: {0}")]
    Injection(String),
}

/// Pointer actuator.
pub trait CursorSink {
    fn move_by(&mut self, dx: i32, dy: i32) -> Result<(), CursorError>;
    fn button_down(&mut self) -> Result<(), CursorError>;
    fn button_up(&mut self) -> Result<(), CursorError>;

    fn send(&mut self, command: PointerCommand) -> Result<(), CursorError> {
        match command {
            PointerCommand::Move { dx, dy } => self.move_by(dx, dy),
            PointerCommand::ButtonDown => self.button_down(),
            PointerCommand::ButtonUp => self.button_up(),
        }
    }
}

/// Commands produced by one engine call, in emission order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EngineOutput {
    pub commands: heapless::Vec<PointerCommand, MAX_COMMANDS_PER_DISPATCH>,
}

impl EngineOutput {
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PointerCommand> {
        self.commands.iter()
    }

    pub fn contains(&self, command: PointerCommand) -> bool {
        self.commands.contains(&command)
    }

    pub fn contains_button_down(&self) -> bool {
        self.contains(PointerCommand::ButtonDown)
    }

    pub fn contains_button_up(&self) -> bool {
        self.contains(PointerCommand::ButtonUp)
    }

    /// Sum of all moves in this output.
    pub fn total_motion(&self) -> (i32, i32) {
        self.commands.iter().fold((0, 0), |(x, y), command| match command {
            PointerCommand::Move { dx, dy } => (x + dx, y + dy),
            _ => (x, y),
        })
    }

    /// Sends every command to `sink`. Actuator failures are logged and the
    /// remaining commands are still attempted.
    pub fn apply(&self, sink: &mut dyn CursorSink) {
        for command in &self.commands {
            if let Err(err) = sink.send(*command) {
                log::warn!("cursor: send_failed kind={} err={}", command.kind(), err);
            }
        }
    }
}

/// In-memory actuator that remembers every command it was given.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordingCursor {
    pub commands: Vec<PointerCommand>,
    pub button_held: bool,
}

impl RecordingCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.commands.iter().map(PointerCommand::kind).collect()
    }

    pub fn total_motion(&self) -> (i64, i64) {
        self.commands.iter().fold((0, 0), |(x, y), command| match command {
            PointerCommand::Move { dx, dy } => (x + i64::from(*dx), y + i64::from(*dy)),
            _ => (x, y),
        })
    }
}

impl CursorSink for RecordingCursor {
    fn move_by(&mut self, dx: i32, dy: i32) -> Result<(), CursorError> {
        self.commands.push(PointerCommand::Move { dx, dy });
        Ok(())
    }

    fn button_down(&mut self) -> Result<(), CursorError> {
        self.button_held = true;
        self.commands.push(PointerCommand::ButtonDown);
        Ok(())
    }

    fn button_up(&mut self) -> Result<(), CursorError> {
        self.button_held = false;
        self.commands.push(PointerCommand::ButtonUp);
        Ok(())
    }
}

/// Cloneable handle over a [`RecordingCursor`], for handing one actuator to
/// a runtime while keeping a way to inspect it.
#[derive(Clone, Debug, Default)]
pub struct SharedRecorder {
    inner: Arc<Mutex<RecordingCursor>>,
}

impl SharedRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> RecordingCursor {
        self.inner.lock().clone()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.inner.lock().kinds()
    }
}

impl CursorSink for SharedRecorder {
    fn move_by(&mut self, dx: i32, dy: i32) -> Result<(), CursorError> {
        self.inner.lock().move_by(dx, dy)
    }

    fn button_down(&mut self) -> Result<(), CursorError> {
        self.inner.lock().button_down()
    }

    fn button_up(&mut self) -> Result<(), CursorError> {
        self.inner.lock().button_up()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FlakyCursor {
        inner: RecordingCursor,
        fail_moves: bool,
    }

    impl CursorSink for FlakyCursor {
        fn move_by(&mut self, dx: i32, dy: i32) -> Result<(), CursorError> {
            if self.fail_moves {
                return Err(CursorError::Injection("queue full".into()));
            }
            self.inner.move_by(dx, dy)
        }

        fn button_down(&mut self) -> Result<(), CursorError> {
            self.inner.button_down()
        }

        fn button_up(&mut self) -> Result<(), CursorError> {
            self.inner.button_up()
        }
    }

    fn output(commands: &[PointerCommand]) -> EngineOutput {
        let mut output = EngineOutput::default();
        for command in commands {
            output.commands.push(*command).expect("capacity");
        }
        output
    }

    #[test]
    fn failures_do_not_stop_remaining_commands() {
        let mut cursor = FlakyCursor {
            inner: RecordingCursor::new(),
            fail_moves: true,
        };
        output(&[
            PointerCommand::ButtonDown,
            PointerCommand::Move { dx: 3, dy: -1 },
            PointerCommand::ButtonUp,
        ])
        .apply(&mut cursor);

        assert_eq!(cursor.inner.kinds(), vec!["down", "up"]);
        assert!(!cursor.inner.button_held);
    }

    #[test]
    fn shared_recorder_sees_commands_from_clones() {
        let recorder = SharedRecorder::new();
        let mut handle = recorder.clone();
        output(&[PointerCommand::ButtonDown, PointerCommand::Move { dx: 4, dy: 2 }])
            .apply(&mut handle);

        let seen = recorder.snapshot();
        assert!(seen.button_held);
        assert_eq!(seen.total_motion(), (4, 2));
    }

    #[test]
    fn total_motion_sums_moves_only() {
        let out = output(&[
            PointerCommand::ButtonDown,
            PointerCommand::Move { dx: 4, dy: 1 },
            PointerCommand::Move { dx: -1, dy: 2 },
        ]);
        assert_eq!(out.total_motion(), (3, 3));
        assert!(out.contains_button_down());
        assert!(!out.contains_button_up());
    }
}
