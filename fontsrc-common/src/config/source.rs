//! Provenance tracking for configuration values.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Where a configuration value came from, lowest precedence first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConfigSource {
    Default,
    File { path: PathBuf },
    Env { var: String },
    Cli,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::File { path } => write!(f, "file {}", path.display()),
            Self::Env { var } => write!(f, "env {var}"),
            Self::Cli => write!(f, "command line"),
        }
    }
}

/// A value together with its [`ConfigSource`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sourced<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> Sourced<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    pub fn default_value(value: T) -> Self {
        Self::new(value, ConfigSource::Default)
    }

    pub fn from_env(value: T, var: impl Into<String>) -> Self {
        Self::new(value, ConfigSource::Env { var: var.into() })
    }

    pub fn from_file(value: T, path: impl Into<PathBuf>) -> Self {
        Self::new(value, ConfigSource::File { path: path.into() })
    }

    pub fn from_cli(value: T) -> Self {
        Self::new(value, ConfigSource::Cli)
    }

    /// Replace the value when `other` came from an explicit source.
    pub fn overlay(&mut self, other: Sourced<T>) {
        if other.source != ConfigSource::Default {
            *self = other;
        }
    }
}

impl<T: Default> Default for Sourced<T> {
    fn default() -> Self {
        Self::default_value(T::default())
    }
}
