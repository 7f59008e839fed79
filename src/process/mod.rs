//! Engine process management on a pseudo-terminal.

mod command;
mod error;
mod output;
mod session;
mod state;

pub use command::EngineCommand;
pub use error::{EngineError, EngineErrorKind, SpawnError};
pub use session::{Match, ProcessSession};
pub use state::{SessionState, SessionStateMachine, SessionStats};
