//! Three-finger drag for multi-touch pointing surfaces.
//!
//! Raw contact batches go into [`gesture::GestureEngine`], which turns them
//! into pointer commands: a held primary button plus relative motion, with
//! optional inertial coasting after a flick. [`runtime::GestureRuntime`] hosts
//! the engine on its own threads for live input.

pub mod config;
pub mod gesture;
pub mod io;
pub mod replay;
pub mod runtime;
pub mod shell;
pub mod touch;

pub use config::Tunables;
pub use gesture::{GestureEngine, GesturePhase};
pub use io::{CursorSink, EngineOutput, PointerCommand};
