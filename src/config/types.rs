//! Configuration types.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backend::{Backend, PatternOverrides, PatternTable};
use crate::process::EngineCommand;

fn default_startup_timeout_ms() -> u64 {
    10_000
}

fn default_query_timeout_ms() -> u64 {
    5_000
}

fn default_continuation_timeout_ms() -> u64 {
    5_000
}

fn default_close_grace_ms() -> u64 {
    2_000
}

/// Options for one engine session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOptions {
    /// Engine executable. Defaults to the backend's usual command name.
    #[serde(default)]
    pub executable: Option<PathBuf>,

    /// Replaces the backend's default arguments when set.
    #[serde(default)]
    pub args: Option<Vec<String>>,

    /// Appended after the default (or replaced) arguments.
    #[serde(default)]
    pub extra_args: Vec<String>,

    #[serde(default = "default_startup_timeout_ms")]
    pub startup_timeout_ms: u64,

    /// Wait for the first reply to a query or directive.
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,

    /// Wait for each further solution.
    #[serde(default = "default_continuation_timeout_ms")]
    pub continuation_timeout_ms: u64,

    /// Time the engine gets to exit after the quit directive or SIGTERM.
    #[serde(default = "default_close_grace_ms")]
    pub close_grace_ms: u64,

    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    /// Extra environment for the engine, as a `[<backend>.env]` table;
    /// applied after `TERM=dumb`.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Module every query is qualified with.
    #[serde(default)]
    pub module: Option<String>,

    /// Switch Flora-2 into expert mode after start-up.
    #[serde(default)]
    pub flora_expert: bool,

    #[serde(default)]
    pub patterns: PatternOverrides,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            executable: None,
            args: None,
            extra_args: Vec::new(),
            startup_timeout_ms: default_startup_timeout_ms(),
            query_timeout_ms: default_query_timeout_ms(),
            continuation_timeout_ms: default_continuation_timeout_ms(),
            close_grace_ms: default_close_grace_ms(),
            working_dir: None,
            env: BTreeMap::new(),
            module: None,
            flora_expert: false,
            patterns: PatternOverrides::default(),
        }
    }
}

impl SessionOptions {
    #[must_use]
    pub fn executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = Some(args.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    #[must_use]
    pub fn flora_expert(mut self, enabled: bool) -> Self {
        self.flora_expert = enabled;
        self
    }

    #[must_use]
    pub fn patterns(mut self, patterns: PatternOverrides) -> Self {
        self.patterns = patterns;
        self
    }

    #[must_use]
    pub fn startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout_ms = duration_ms(timeout);
        self
    }

    #[must_use]
    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout_ms = duration_ms(timeout);
        self
    }

    #[must_use]
    pub fn continuation_timeout(mut self, timeout: Duration) -> Self {
        self.continuation_timeout_ms = duration_ms(timeout);
        self
    }

    #[must_use]
    pub fn close_grace(mut self, grace: Duration) -> Self {
        self.close_grace_ms = duration_ms(grace);
        self
    }

    #[must_use]
    pub fn startup_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }

    #[must_use]
    pub fn query_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    #[must_use]
    pub fn continuation_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.continuation_timeout_ms)
    }

    #[must_use]
    pub fn close_grace_duration(&self) -> Duration {
        Duration::from_millis(self.close_grace_ms)
    }

    /// Build the launch command for `table`'s backend.
    #[must_use]
    pub fn command(&self, table: &PatternTable) -> EngineCommand {
        let program = self
            .executable
            .clone()
            .unwrap_or_else(|| PathBuf::from(table.default_executable()));
        let args = self
            .args
            .as_deref()
            .unwrap_or(table.default_args())
            .iter()
            .chain(&self.extra_args)
            .cloned();

        let mut command = EngineCommand::new(program).args(args);
        if let Some(dir) = &self.working_dir {
            command = command.working_dir(dir);
        }
        for (key, value) in &self.env {
            command = command.env(key, value);
        }
        command
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Per-backend session options, as stored in a configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub xsb: SessionOptions,
    pub swi: SessionOptions,
    pub eclipse: SessionOptions,
    pub flora2: SessionOptions,
}

impl BridgeConfig {
    /// Options configured for `backend`.
    #[must_use]
    pub fn options_for(&self, backend: Backend) -> &SessionOptions {
        match backend {
            Backend::Xsb => &self.xsb,
            Backend::Swi => &self.swi,
            Backend::Eclipse => &self.eclipse,
            Backend::Flora2 => &self.flora2,
        }
    }
}
