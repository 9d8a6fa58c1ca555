//! Driver: enumerate → extract → resolve → fetch for a whole corpus.

use crate::config::FetchConfig;
use crate::enumerate::enumerate_records;
use crate::errors::{FailureKind, Result};
use crate::facts::extract_facts;
use crate::fetch::{FetchEvent, FetchOptions, Fetcher, destination_dir};
use crate::ledger::FailureLedger;
use crate::metadata::{FsMetadataStore, MetadataStore};
use crate::policy::{Denylist, resolve};
use crate::types::{Outcome, RecordLocator};
use crate::upstream::{FsUpstreamStore, UpstreamStore};
use crate::util::mask_url_credentials;
use crate::vcs::VcsClient;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, info_span};

/// One configured pass over a corpus.
pub struct Pipeline<'a> {
    corpus_root: PathBuf,
    sources_root: PathBuf,
    failures_dir: PathBuf,
    metadata: &'a dyn MetadataStore,
    upstream: &'a dyn UpstreamStore,
    vcs: &'a dyn VcsClient,
    options: FetchOptions,
    denylist: Denylist,
}

impl<'a> Pipeline<'a> {
    /// Filesystem stores, default options, reports under `<sources_root>/failures`.
    pub fn new(
        corpus_root: impl Into<PathBuf>,
        sources_root: impl Into<PathBuf>,
        vcs: &'a dyn VcsClient,
    ) -> Self {
        let sources_root = sources_root.into();
        Self {
            corpus_root: corpus_root.into(),
            failures_dir: sources_root.join(crate::config::FAILURES_DIR),
            sources_root,
            metadata: &FsMetadataStore,
            upstream: &FsUpstreamStore,
            vcs,
            options: FetchOptions::default(),
            denylist: Denylist::default(),
        }
    }

    pub fn from_config(config: &FetchConfig, vcs: &'a dyn VcsClient) -> Self {
        Self::new(
            config.corpus_root.value.clone(),
            config.sources_root.value.clone(),
            vcs,
        )
        .with_options(config.fetch_options())
        .with_denylist(config.denylist())
        .with_failures_dir(config.failures_dir())
    }

    #[must_use]
    pub fn with_options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_denylist(mut self, denylist: Denylist) -> Self {
        self.denylist = denylist;
        self
    }

    #[must_use]
    pub fn with_failures_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.failures_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_stores(
        mut self,
        metadata: &'a dyn MetadataStore,
        upstream: &'a dyn UpstreamStore,
    ) -> Self {
        self.metadata = metadata;
        self.upstream = upstream;
        self
    }

    /// Process every record in sorted order.
    ///
    /// Record-level failures go to the ledger and the run continues. Only
    /// pipeline errors (unknown license category, unreadable corpus, report
    /// I/O) abort.
    pub fn run(&self) -> Result<RunSummary> {
        let records = enumerate_records(&self.corpus_root)?;
        let mut ledger = FailureLedger::open(&self.failures_dir)?;
        let mut fetcher = Fetcher::new(self.vcs, self.options.clone());
        let mut summary = RunSummary {
            total_records: records.len(),
            ..RunSummary::default()
        };

        info!(
            corpus = %self.corpus_root.display(),
            records = records.len(),
            "starting source acquisition"
        );

        for record in &records {
            let _span = info_span!("record", path = %record).entered();
            match self.process(record, &mut fetcher)? {
                Ok(event) => summary.note(event),
                Err(Outcome::Unresolved { kind, detail }) => ledger.record(kind, record, detail)?,
                Err(Outcome::Resolved { .. }) => {}
            }
        }

        summary.failures = ledger.counts().clone();
        summary.report_paths = summary
            .failures
            .keys()
            .map(|kind| (*kind, ledger.report_path(*kind)))
            .collect();
        summary.succeeded = summary.total_records - ledger.len();

        info!(
            succeeded = summary.succeeded,
            failed = ledger.len(),
            clones = summary.clones,
            local_copies = summary.local_copies,
            "source acquisition finished"
        );
        Ok(summary)
    }

    /// Outer error aborts the run; inner error is the record's failure.
    fn process(
        &self,
        record: &RecordLocator,
        fetcher: &mut Fetcher<'_>,
    ) -> Result<std::result::Result<FetchEvent, Outcome>> {
        let facts = match extract_facts(record, self.metadata, self.upstream) {
            Ok(facts) => facts,
            Err(outcome) => return Ok(Err(outcome)),
        };

        let url = match resolve(&facts, &self.denylist) {
            Outcome::Resolved { repository_url } => repository_url,
            unresolved => return Ok(Err(unresolved)),
        };
        debug!(url = %mask_url_credentials(&url), "resolved");

        let dest = destination_dir(&self.sources_root, record)?;
        Ok(fetcher.fetch(&url, &dest))
    }

    #[must_use]
    pub fn failures_dir(&self) -> &Path {
        &self.failures_dir
    }
}

/// Aggregate result of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total_records: usize,
    pub succeeded: usize,
    pub local_copies: usize,
    pub clones: usize,
    pub pulls: usize,
    pub failures: BTreeMap<FailureKind, usize>,
    pub report_paths: BTreeMap<FailureKind, PathBuf>,
}

impl RunSummary {
    fn note(&mut self, event: FetchEvent) {
        match event {
            FetchEvent::Cloned => self.clones += 1,
            FetchEvent::Pulled => self.pulls += 1,
            FetchEvent::LocalCopy => self.local_copies += 1,
            FetchEvent::PullSkipped => {}
        }
    }

    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures.values().sum()
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// 0 when no record failed, 1 otherwise.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        u8::from(!self.is_clean())
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Acquired sources for {}/{} records",
            self.succeeded, self.total_records
        )?;
        writeln!(
            f,
            "{} use the same repository and were copied locally",
            self.local_copies
        )?;
        writeln!(f, "failures:")?;
        for (kind, count) in &self.failures {
            match self.report_paths.get(kind) {
                Some(path) => writeln!(
                    f,
                    "{count}/{} {kind} ({})",
                    self.total_records,
                    path.display()
                )?,
                None => writeln!(f, "{count}/{} {kind}", self.total_records)?,
            }
        }
        Ok(())
    }
}
