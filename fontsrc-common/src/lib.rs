//! Source acquisition for font family metadata corpora.
//!
//! Walks a corpus of family records, reconciles the repository and archive
//! URLs each record declares in `METADATA.pb` and `upstream.yaml`, mirrors
//! every resolvable repository under a local sources tree and files every
//! other record into a per-kind failure report.

pub mod config;
pub mod enumerate;
pub mod errors;
pub mod facts;
pub mod fetch;
pub mod ledger;
pub mod logging;
pub mod metadata;
pub mod pipeline;
pub mod policy;
pub mod types;
pub mod upstream;
pub mod util;
pub mod vcs;

pub use config::{ConfigError, ConfigSource, FetchConfig, Sourced};
pub use enumerate::enumerate_records;
pub use errors::{FailureKind, PipelineError};
pub use facts::extract_facts;
pub use fetch::{FetchEvent, FetchOptions, FetchState, Fetcher, destination_dir};
pub use ledger::{FailureEntry, FailureLedger};
pub use logging::{LogConfig, LoggingError, LoggingGuards, init_logging};
pub use metadata::{FsMetadataStore, MetadataError, MetadataStore};
pub use pipeline::{Pipeline, RunSummary};
pub use policy::{Denylist, resolve};
pub use types::{DeclaredSource, LicenseCategory, Outcome, RecordLocator, SourceFacts};
pub use upstream::{
    BackfillReport, FsUpstreamStore, UpstreamError, UpstreamStore, backfill_repository_urls,
    infer_repository_url,
};
pub use vcs::{CommandFailure, GitCli, RecordingVcs, VcsClient};
