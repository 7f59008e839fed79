//! Errors surfaced by the session API.

use crate::backend::PatternError;
use crate::config::ConfigError;
use crate::process::{EngineError, EngineErrorKind, SessionState, SpawnError};
use crate::term::ParseError;

/// Any failure of a session operation.
#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Spawn(#[from] SpawnError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Pattern(#[from] PatternError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The session is not in a state that accepts the operation.
    #[error("Session is not ready (state: {state:?}); restart it to continue")]
    NotReady { state: SessionState },
    #[error("Empty query")]
    EmptyQuery,
}

impl SessionError {
    /// Classification when the failure came from the engine.
    #[must_use]
    pub fn engine_kind(&self) -> Option<EngineErrorKind> {
        match self {
            Self::Engine(e) => Some(e.kind),
            _ => None,
        }
    }
}
