//! Process and engine error types.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// Error type for spawning an engine process.
#[derive(thiserror::Error, Debug)]
pub enum SpawnError {
    /// The executable was not found on disk or in `PATH`.
    #[error("Engine executable not found: {0}")]
    NotFound(PathBuf),
    /// Permission denied when spawning.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    /// The pseudo-terminal could not be opened or attached.
    #[error("Pseudo-terminal error: {0}")]
    Pty(String),
    /// Other I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SpawnError {
    /// Create a `SpawnError` from an I/O error, classifying common cases.
    pub(crate) fn from_io(err: std::io::Error, program: PathBuf) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(program),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(program),
            _ => Self::Io(err),
        }
    }
}

/// Classification of a problem reported by, or about, a running engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineErrorKind {
    /// The engine rejected the goal's syntax.
    Syntax,
    /// The engine raised an error while evaluating.
    Runtime,
    /// No expected pattern appeared within the configured window.
    Timeout,
    /// The engine process exited or was killed.
    ProcessTerminated,
}

impl fmt::Display for EngineErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Syntax => "Engine syntax error",
            Self::Runtime => "Engine runtime error",
            Self::Timeout => "Timed out waiting for engine",
            Self::ProcessTerminated => "Engine process terminated",
        })
    }
}

/// A classified engine problem carrying the raw diagnostic text.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {diagnostic}")]
pub struct EngineError {
    pub kind: EngineErrorKind,
    pub diagnostic: String,
}

impl EngineError {
    #[must_use]
    pub fn new(kind: EngineErrorKind, diagnostic: impl Into<String>) -> Self {
        Self {
            kind,
            diagnostic: diagnostic.into(),
        }
    }

    #[must_use]
    pub fn timeout(diagnostic: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::Timeout, diagnostic)
    }

    #[must_use]
    pub fn terminated(diagnostic: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::ProcessTerminated, diagnostic)
    }

    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.kind == EngineErrorKind::ProcessTerminated
    }
}
