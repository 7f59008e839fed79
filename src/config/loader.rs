//! Locating and reading `BridgeConfig` files.

use std::path::{Path, PathBuf};

use crate::backend::{Backend, PatternError, PatternTable};

use super::BridgeConfig;

/// Environment variable naming a config file to use before the search paths.
pub const CONFIG_ENV: &str = "LOGIC_BRIDGE_CONFIG";

const LOCAL_FILE: &str = ".logic-bridge.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Source {
    /// A file the caller asked for; it must exist.
    Explicit(PathBuf),
    /// Candidates tried in order; none existing means defaults.
    Search(Vec<PathBuf>),
}

/// Finds the configuration file and turns it into a [`BridgeConfig`].
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    source: Source,
}

impl ConfigLoader {
    /// Search `$LOGIC_BRIDGE_CONFIG`, then `./.logic-bridge.toml`, then
    /// `<config dir>/logic-bridge/config.toml`.
    #[must_use]
    pub fn new() -> Self {
        let mut candidates: Vec<PathBuf> = std::env::var_os(CONFIG_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .into_iter()
            .collect();
        candidates.push(PathBuf::from(LOCAL_FILE));
        if let Some(dir) = dirs::config_dir() {
            candidates.push(dir.join("logic-bridge").join("config.toml"));
        }
        Self {
            source: Source::Search(candidates),
        }
    }

    /// Read exactly this file. Unlike the search, a missing file is an error.
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            source: Source::Explicit(path),
        }
    }

    /// Paths this loader looks at, in order.
    #[must_use]
    pub fn search_paths(&self) -> &[PathBuf] {
        match &self.source {
            Source::Explicit(path) => std::slice::from_ref(path),
            Source::Search(candidates) => candidates,
        }
    }

    /// The file `load` would read, if any.
    #[must_use]
    pub fn find_config_file(&self) -> Option<PathBuf> {
        self.search_paths().iter().find(|p| p.is_file()).cloned()
    }

    /// Load and validate the configuration.
    ///
    /// # Errors
    ///
    /// `NotFound` for a missing explicit file, `ReadError`/`ParseError` for a
    /// file that cannot be read as TOML, and `InvalidPattern` when a backend's
    /// pattern overrides do not compile.
    pub fn load(&self) -> Result<BridgeConfig, ConfigError> {
        let path = match (&self.source, self.find_config_file()) {
            (_, Some(path)) => path,
            (Source::Explicit(path), None) => {
                return Err(ConfigError::NotFound { path: path.clone() })
            }
            (Source::Search(_), None) => {
                tracing::debug!("No config file found, using defaults");
                return Ok(BridgeConfig::default());
            }
        };

        tracing::debug!(path = %path.display(), "Loading config file");
        let config = Self::load_from_path(&path)?;
        validate(&config, &path)?;
        Ok(config)
    }

    /// Parse one file without validating it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn load_from_path(path: &Path) -> Result<BridgeConfig, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Compile every backend's overrides so a bad regex is reported at load time,
/// not when a session for that backend is first opened.
fn validate(config: &BridgeConfig, path: &Path) -> Result<(), ConfigError> {
    for backend in Backend::ALL {
        let overrides = &config.options_for(backend).patterns;
        PatternTable::with_overrides(backend, overrides).map_err(|source| {
            ConfigError::InvalidPattern {
                path: path.to_path_buf(),
                backend,
                source,
            }
        })?;
    }
    Ok(())
}

/// Errors that can occur during configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("{path}: [{backend}] {source}")]
    InvalidPattern {
        path: PathBuf,
        backend: Backend,
        source: PatternError,
    },
}
