//! Engine launch configuration.

use std::path::{Path, PathBuf};

use super::SpawnError;

/// Builder for the command line an engine is launched with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineCommand {
    program: PathBuf,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    env: Vec<(String, String)>,
}

impl EngineCommand {
    /// Create a new command for the given executable.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory for the engine process.
    #[must_use]
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Set an environment variable. Later values win.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    #[must_use]
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    #[must_use]
    pub fn get_working_dir(&self) -> Option<&PathBuf> {
        self.working_dir.as_ref()
    }

    #[must_use]
    pub fn get_env(&self) -> &[(String, String)] {
        &self.env
    }

    /// Resolve the executable to an absolute path.
    ///
    /// Bare names are looked up in `PATH`; relative paths are resolved
    /// against the working directory when one is set.
    ///
    /// # Errors
    ///
    /// Returns `SpawnError::NotFound` or `SpawnError::PermissionDenied` when
    /// the executable cannot be run.
    pub fn resolve_program(&self) -> Result<PathBuf, SpawnError> {
        let candidate = match &self.working_dir {
            Some(dir) if self.program.components().count() > 1 && self.program.is_relative() => {
                dir.join(&self.program)
            }
            _ => self.program.clone(),
        };

        match which::which(&candidate) {
            Ok(path) => Ok(path),
            Err(_) => match std::fs::metadata(&candidate) {
                Ok(meta) if meta.is_file() => Err(SpawnError::PermissionDenied(candidate)),
                Ok(_) => Err(SpawnError::NotFound(candidate)),
                Err(e) => Err(SpawnError::from_io(e, candidate)),
            },
        }
    }
}
