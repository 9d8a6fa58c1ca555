//! `fontsrc backfill`: add `repository_url` next to GitHub archive URLs.

use super::load_config;
use anyhow::{Context, Result};
use clap::Args;
use fontsrc_common::{backfill_repository_urls, enumerate_records};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Args)]
pub struct BackfillArgs {
    /// Local clone of the metadata corpus
    #[arg(long, value_name = "PATH")]
    pub corpus: Option<PathBuf>,

    /// Report what would change without writing
    #[arg(long)]
    pub dry_run: bool,
}

pub fn run(args: &BackfillArgs, config_path: Option<&std::path::Path>) -> Result<u8> {
    let corpus = match &args.corpus {
        Some(corpus) => corpus.clone(),
        None => load_config(config_path)?.corpus_root.value,
    };
    let records = enumerate_records(&corpus)
        .with_context(|| format!("Failed to enumerate {}", corpus.display()))?;
    info!(records = records.len(), dry_run = args.dry_run, "backfilling repository_url");

    let report = backfill_repository_urls(&records, args.dry_run);

    for mismatch in &report.mismatches {
        println!(
            "{} has unexpected repo url {} (archive implies {})",
            mismatch.path.display(),
            mismatch.declared.as_deref().unwrap_or("<none>"),
            mismatch.inferred
        );
    }
    for (path, error) in &report.unreadable {
        println!("Failed to load {} {error}", path.display());
    }
    let verb = if args.dry_run { "would be added" } else { "added" };
    println!("{} repository_url entries {verb}", report.fixed.len());
    Ok(0)
}
