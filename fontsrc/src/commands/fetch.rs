//! `fontsrc fetch`: run the acquisition pipeline.

use super::load_config;
use anyhow::{Context, Result};
use clap::Args;
use fontsrc_common::{FetchConfig, GitCli, Pipeline, Sourced};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Local clone of the metadata corpus
    #[arg(long, value_name = "PATH")]
    pub corpus: Option<PathBuf>,

    /// Mirror root; failure reports go to <PATH>/failures
    #[arg(long, value_name = "PATH")]
    pub sources: Option<PathBuf>,

    /// Leave existing clones untouched instead of pulling them
    #[arg(long)]
    pub no_pull: bool,

    /// Clone depth, 0 for full history
    #[arg(long, value_name = "N")]
    pub clone_depth: Option<u32>,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
}

impl FetchArgs {
    /// Command-line flags win over every other layer.
    fn apply(&self, config: &mut FetchConfig) {
        if let Some(corpus) = &self.corpus {
            config.corpus_root = Sourced::from_cli(corpus.clone());
        }
        if let Some(sources) = &self.sources {
            config.sources_root = Sourced::from_cli(sources.clone());
        }
        if self.no_pull {
            config.pull_existing = Sourced::from_cli(false);
        }
        if let Some(depth) = self.clone_depth {
            config.clone_depth = Sourced::from_cli(depth);
        }
    }
}

pub fn run(args: &FetchArgs, config_path: Option<&Path>) -> Result<u8> {
    let mut config = load_config(config_path)?;
    args.apply(&mut config);
    config.validate().context("Invalid command line")?;
    debug!(
        pull_existing = config.pull_existing.value,
        clone_depth = config.clone_depth.value,
        "fetch settings"
    );

    let git = GitCli::default();
    let summary = Pipeline::from_config(&config, &git)
        .run()
        .context("Source acquisition aborted")?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?
        );
    } else {
        print!("{summary}");
    }
    for kind in summary.failures.keys() {
        info!(kind = %kind, "{}", kind.remediation());
    }
    Ok(summary.exit_code())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fontsrc_common::ConfigSource;

    fn args() -> FetchArgs {
        FetchArgs {
            corpus: None,
            sources: None,
            no_pull: false,
            clone_depth: None,
            json: false,
        }
    }

    #[test]
    fn flags_override_config() {
        let mut config = FetchConfig::default();
        let args = FetchArgs {
            corpus: Some(PathBuf::from("/corpus")),
            no_pull: true,
            clone_depth: Some(0),
            ..args()
        };
        args.apply(&mut config);

        assert_eq!(config.corpus_root.value, PathBuf::from("/corpus"));
        assert_eq!(config.corpus_root.source, ConfigSource::Cli);
        assert!(!config.pull_existing.value);
        assert_eq!(config.clone_depth.value, 0);
        assert_eq!(config.sources_root.source, ConfigSource::Default);
    }

    #[test]
    fn absent_flags_keep_config() {
        let mut config = FetchConfig::default();
        args().apply(&mut config);
        assert!(config.pull_existing.value);
        assert_eq!(config.clone_depth.value, 1);
        assert_eq!(config.pull_existing.source, ConfigSource::Default);
    }
}
