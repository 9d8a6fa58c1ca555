//! Configuration for fontsrc.
//!
//! Values are layered, later layers winning:
//! built-in defaults < TOML config file < `FONTSRC_*` environment < CLI flags.
//! Each value remembers where it came from so `--verbose` runs can log it.

pub mod env;
pub mod source;

pub use env::{EnvError, EnvParser, expand_home};
pub use source::{ConfigSource, Sourced};

use crate::fetch::{DEFAULT_EXCLUDED_DIRS, FetchOptions};
use crate::policy::{DEFAULT_DENY_REPO_URLS, Denylist};
use directories::ProjectDirs;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Name of the directory holding failure reports inside the sources root.
pub const FAILURES_DIR: &str = "failures";

/// Largest accepted clone depth.
pub const MAX_CLONE_DEPTH: u32 = 10_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid environment: {}", format_env_errors(.0))]
    Env(Vec<EnvError>),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

fn format_env_errors(errors: &[EnvError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// On-disk config file shape. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    corpus_root: Option<String>,
    sources_root: Option<String>,
    pull_existing: Option<bool>,
    clone_depth: Option<u32>,
    excluded_dir_names: Option<Vec<String>>,
    deny_repo_urls: Option<Vec<String>>,
}

/// Resolved configuration for a fetch run.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Local clone of the metadata corpus.
    pub corpus_root: Sourced<PathBuf>,
    /// Mirror root; failure reports go to `<sources_root>/failures`.
    pub sources_root: Sourced<PathBuf>,
    pub pull_existing: Sourced<bool>,
    pub clone_depth: Sourced<u32>,
    pub excluded_dir_names: Sourced<Vec<String>>,
    pub deny_repo_urls: Sourced<Vec<String>>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            corpus_root: Sourced::default_value(default_corpus_root()),
            sources_root: Sourced::default_value(PathBuf::from("sources")),
            pull_existing: Sourced::default_value(true),
            clone_depth: Sourced::default_value(1),
            excluded_dir_names: Sourced::default_value(
                DEFAULT_EXCLUDED_DIRS.iter().map(|s| (*s).to_string()).collect(),
            ),
            deny_repo_urls: Sourced::default_value(
                DEFAULT_DENY_REPO_URLS.iter().map(|s| (*s).to_string()).collect(),
            ),
        }
    }
}

/// `~/oss/fonts`, the conventional location of the corpus clone.
pub fn default_corpus_root() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("oss")
        .join("fonts")
}

/// `<platform config dir>/fontsrc/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "fontsrc").map(|dirs| dirs.config_dir().join("config.toml"))
}

impl FetchConfig {
    /// Defaults, then the config file, then the environment.
    ///
    /// An explicit `config_path` must exist; the default path is optional.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let file = match config_path {
            Some(path) => Some(path.to_path_buf()),
            None => default_config_path().filter(|p| p.is_file()),
        };
        if let Some(path) = file {
            config.apply_file(&path)?;
        }

        let mut parser = EnvParser::new();
        config.apply_env(&mut parser);
        if parser.has_errors() {
            return Err(ConfigError::Env(parser.take_errors()));
        }

        config.validate()?;
        Ok(config)
    }

    fn apply_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.apply_file_str(&text, path)
    }

    fn apply_file_str(&mut self, text: &str, path: &Path) -> Result<(), ConfigError> {
        let file: FileConfig = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded config file");

        if let Some(v) = file.corpus_root {
            self.corpus_root = Sourced::from_file(expand_home(&v), path);
        }
        if let Some(v) = file.sources_root {
            self.sources_root = Sourced::from_file(expand_home(&v), path);
        }
        if let Some(v) = file.pull_existing {
            self.pull_existing = Sourced::from_file(v, path);
        }
        if let Some(v) = file.clone_depth {
            self.clone_depth = Sourced::from_file(v, path);
        }
        if let Some(v) = file.excluded_dir_names {
            self.excluded_dir_names = Sourced::from_file(v, path);
        }
        if let Some(v) = file.deny_repo_urls {
            self.deny_repo_urls = Sourced::from_file(v, path);
        }
        Ok(())
    }

    fn apply_env(&mut self, parser: &mut EnvParser) {
        if let Some(v) = parser.get_path("CORPUS_ROOT") {
            self.corpus_root.overlay(v);
        }
        if let Some(v) = parser.get_path("SOURCES_ROOT") {
            self.sources_root.overlay(v);
        }
        if let Some(v) = parser.get_bool("PULL_EXISTING") {
            self.pull_existing.overlay(v);
        }
        if let Some(v) = parser.get_u32_range("CLONE_DEPTH", 0, MAX_CLONE_DEPTH) {
            self.clone_depth.overlay(v);
        }
        if let Some(v) = parser.get_list("EXCLUDED_DIRS") {
            self.excluded_dir_names.overlay(v);
        }
        if let Some(v) = parser.get_list("DENY_REPO_URLS") {
            self.deny_repo_urls.overlay(v);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.clone_depth.value > MAX_CLONE_DEPTH {
            return Err(ConfigError::Invalid(format!(
                "clone_depth {} exceeds {MAX_CLONE_DEPTH} ({})",
                self.clone_depth.value, self.clone_depth.source
            )));
        }
        if let Some(bad) = self
            .excluded_dir_names
            .value
            .iter()
            .find(|name| name.is_empty() || name.contains('/'))
        {
            return Err(ConfigError::Invalid(format!(
                "excluded directory name '{bad}' must be a single path component"
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn failures_dir(&self) -> PathBuf {
        self.sources_root.value.join(FAILURES_DIR)
    }

    #[must_use]
    pub fn denylist(&self) -> Denylist {
        Denylist::new(self.deny_repo_urls.value.iter().cloned())
    }

    #[must_use]
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            pull_existing: self.pull_existing.value,
            clone_depth: self.clone_depth.value,
            excluded_dir_names: self.excluded_dir_names.value.clone(),
        }
    }
}
