//! Logging setup shared by the fontsrc binary and tests.
//!
//! Human-readable output goes to stderr; stdout carries only the run summary.
//! An optional JSON log file is written through a non-blocking appender.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// Environment variable holding the filter directive.
pub const LOG_ENV: &str = "FONTSRC_LOG";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter '{directive}': {message}")]
    Filter { directive: String, message: String },

    #[error("cannot create log directory {}: {source}", path.display())]
    LogDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("logging already initialized: {0}")]
    AlreadyInitialized(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// `EnvFilter` directive, e.g. `info` or `fontsrc_common=debug`.
    pub level: String,
    pub target: LogTarget,
    /// Optional JSON log file.
    pub file: Option<PathBuf>,
    pub ansi: bool,
}

impl LogConfig {
    /// Filter from `FONTSRC_LOG`, then `RUST_LOG`, then `default_level`.
    pub fn from_env(default_level: &str) -> Self {
        let level = [LOG_ENV, "RUST_LOG"]
            .iter()
            .find_map(|var| std::env::var(var).ok().filter(|v| !v.trim().is_empty()))
            .unwrap_or_else(|| default_level.to_string());
        Self {
            level,
            target: LogTarget::Stdout,
            file: None,
            ansi: true,
        }
    }

    #[must_use]
    pub fn with_stderr(mut self) -> Self {
        self.target = LogTarget::Stderr;
        self
    }

    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    #[must_use]
    pub fn without_ansi(mut self) -> Self {
        self.ansi = false;
        self
    }

    fn filter(&self) -> Result<EnvFilter, LoggingError> {
        EnvFilter::try_new(&self.level).map_err(|e| LoggingError::Filter {
            directive: self.level.clone(),
            message: e.to_string(),
        })
    }
}

/// Guards flushing the non-blocking writers; hold them for the whole run.
#[must_use = "dropping the guards stops log flushing"]
#[derive(Default)]
pub struct LoggingGuards {
    _guards: Vec<WorkerGuard>,
}

/// Install the global subscriber described by `config`.
pub fn init_logging(config: &LogConfig) -> Result<LoggingGuards, LoggingError> {
    let mut guards = Vec::new();

    let console = match config.target {
        LogTarget::Stdout => fmt::layer()
            .with_ansi(config.ansi)
            .with_target(false)
            .boxed(),
        LogTarget::Stderr => fmt::layer()
            .with_ansi(config.ansi)
            .with_target(false)
            .with_writer(io::stderr)
            .boxed(),
    };

    let file_layer = match &config.file {
        Some(path) => {
            let (dir, name) = split_log_path(path);
            std::fs::create_dir_all(&dir).map_err(|source| LoggingError::LogDir {
                path: dir.clone(),
                source,
            })?;
            let appender = tracing_appender::rolling::never(&dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            guards.push(guard);
            Some(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer)
                    .boxed(),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .with(config.filter()?)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    Ok(LoggingGuards { _guards: guards })
}

fn split_log_path(path: &Path) -> (PathBuf, String) {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let name = path
        .file_name()
        .map_or_else(|| "fontsrc.log".to_string(), |n| n.to_string_lossy().into_owned());
    (dir, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_set_fields() {
        let config = LogConfig::from_env("info")
            .with_stderr()
            .with_level("debug")
            .with_file("/tmp/fontsrc/run.json")
            .without_ansi();
        assert_eq!(config.level, "debug");
        assert_eq!(config.target, LogTarget::Stderr);
        assert_eq!(config.file.as_deref(), Some(Path::new("/tmp/fontsrc/run.json")));
        assert!(!config.ansi);
    }

    #[test]
    fn invalid_filter_is_reported() {
        let config = LogConfig::from_env("info").with_level("fontsrc=loudest");
        assert!(matches!(config.filter(), Err(LoggingError::Filter { .. })));
    }

    #[test]
    fn split_log_path_defaults_to_cwd() {
        assert_eq!(
            split_log_path(Path::new("run.json")),
            (PathBuf::from("."), "run.json".to_string())
        );
        assert_eq!(
            split_log_path(Path::new("logs/run.json")),
            (PathBuf::from("logs"), "run.json".to_string())
        );
    }
}
