//! Supported engine families.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One family of interactive logic engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// XSB Prolog.
    Xsb,
    /// SWI-Prolog.
    Swi,
    /// ECLiPSe constraint logic programming system.
    Eclipse,
    /// Flora-2 / Ergo Lite, running on top of XSB.
    Flora2,
}

impl Backend {
    /// All backends, in declaration order.
    pub const ALL: [Backend; 4] = [Self::Xsb, Self::Swi, Self::Eclipse, Self::Flora2];

    /// Lowercase name used in configuration files and on the command line.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Xsb => "xsb",
            Self::Swi => "swi",
            Self::Eclipse => "eclipse",
            Self::Flora2 => "flora2",
        }
    }

    /// Whether the engine speaks Prolog term syntax for variables.
    #[must_use]
    pub fn is_prolog(self) -> bool {
        !matches!(self, Self::Flora2)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a backend name is not recognized.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown backend: {0}")]
pub struct UnknownBackend(pub String);

impl FromStr for Backend {
    type Err = UnknownBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xsb" => Ok(Self::Xsb),
            "swi" | "swipl" => Ok(Self::Swi),
            "eclipse" => Ok(Self::Eclipse),
            "flora2" | "flora" => Ok(Self::Flora2),
            _ => Err(UnknownBackend(s.to_string())),
        }
    }
}
