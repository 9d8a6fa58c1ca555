//! Subcommand implementations. Each returns the process exit status.

pub mod backfill;
pub mod fetch;
pub mod unshallow;

use anyhow::{Context, Result};
use fontsrc_common::FetchConfig;
use std::path::Path;
use tracing::debug;

/// Load configuration from file and environment.
pub fn load_config(config_path: Option<&Path>) -> Result<FetchConfig> {
    let config = FetchConfig::load(config_path).context("Failed to load configuration")?;
    debug!(
        corpus_root = %config.corpus_root.value.display(),
        corpus_root_source = %config.corpus_root.source,
        sources_root = %config.sources_root.value.display(),
        sources_root_source = %config.sources_root.source,
        "configuration loaded"
    );
    Ok(config)
}
