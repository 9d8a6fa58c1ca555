//! fontsrc - mirror the upstream sources declared by a font metadata corpus.
//!
//! Exit status: 0 when every record was acquired, 1 when at least one record
//! failed (see `sources/failures/`), 2 when the run could not complete.

#![forbid(unsafe_code)]

mod commands;

use clap::{Parser, Subcommand};
use commands::backfill::BackfillArgs;
use commands::fetch::FetchArgs;
use fontsrc_common::{LogConfig, init_logging};
use std::path::PathBuf;
use std::process::ExitCode;

/// Exit status for errors that stop the run.
const FATAL_EXIT: u8 = 2;

#[derive(Parser)]
#[command(name = "fontsrc")]
#[command(author, version, about = "Mirror upstream font sources declared in a metadata corpus")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: <config dir>/fontsrc/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Also write JSON logs to this file
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Clone, pull or copy the source repository of every record
    Fetch(FetchArgs),

    /// Add repository_url to upstream files that only name a GitHub archive
    Backfill(BackfillArgs),

    /// Fetch the full history of a shallow mirror
    Unshallow {
        /// Mirror directory, e.g. sources/ofl/roboto
        #[arg(value_name = "DIR")]
        dir: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut log_config = LogConfig::from_env("info").with_stderr();
    if cli.verbose {
        log_config = log_config.with_level("debug");
    }
    if let Some(path) = &cli.log_file {
        log_config = log_config.with_file(path);
    }
    let _logging_guards = match init_logging(&log_config) {
        Ok(guards) => guards,
        Err(e) => {
            eprintln!("fontsrc: {e}");
            return ExitCode::from(FATAL_EXIT);
        }
    };

    let config = cli.config.as_deref();
    let result = match &cli.command {
        Commands::Fetch(args) => commands::fetch::run(args, config),
        Commands::Backfill(args) => commands::backfill::run(args, config),
        Commands::Unshallow { dir } => commands::unshallow::run(dir),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("fontsrc: {e:#}");
            ExitCode::from(FATAL_EXIT)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_fetch_flags() {
        let cli = Cli::try_parse_from([
            "fontsrc",
            "fetch",
            "--corpus",
            "/data/fonts",
            "--no-pull",
            "--clone-depth",
            "0",
            "--json",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        let Commands::Fetch(args) = cli.command else {
            panic!("expected fetch");
        };
        assert_eq!(args.corpus.as_deref(), Some(std::path::Path::new("/data/fonts")));
        assert!(args.no_pull);
        assert_eq!(args.clone_depth, Some(0));
        assert!(args.json);
        assert!(args.sources.is_none());
    }

    #[test]
    fn global_config_after_subcommand() {
        let cli =
            Cli::try_parse_from(["fontsrc", "backfill", "--dry-run", "--config", "f.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("f.toml")));
        let Commands::Backfill(args) = cli.command else {
            panic!("expected backfill");
        };
        assert!(args.dry_run);
    }

    #[test]
    fn unshallow_requires_a_directory() {
        assert!(Cli::try_parse_from(["fontsrc", "unshallow"]).is_err());
        let cli = Cli::try_parse_from(["fontsrc", "unshallow", "sources/ofl/a"]).unwrap();
        assert!(matches!(cli.command, Commands::Unshallow { dir } if dir == PathBuf::from("sources/ofl/a")));
    }
}
