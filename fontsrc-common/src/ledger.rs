//! Failure ledger: per-kind report files plus in-memory counts.
//!
//! Reports live in `<sources>/failures/<kind>.txt`, one line per failing
//! record. Opening the ledger truncates every existing report so a kind with
//! no failures this run ends up empty, and each entry is appended as soon as
//! it is recorded so an interrupted run still leaves its progress on disk.

use crate::errors::{FailureKind, PipelineError, Result};
use crate::types::RecordLocator;
use crate::util::flatten_lines;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One failing record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureEntry {
    pub kind: FailureKind,
    /// Corpus-relative record path.
    pub record: PathBuf,
    pub detail: Option<String>,
}

impl FailureEntry {
    /// Report line (without trailing newline).
    #[must_use]
    pub fn report_line(&self) -> String {
        let mut line = self.record.display().to_string();
        if let Some(detail) = self.detail.as_deref().map(flatten_lines)
            && !detail.is_empty()
        {
            line.push(' ');
            line.push_str(&detail);
        }
        line
    }
}

pub struct FailureLedger {
    dir: PathBuf,
    entries: Vec<FailureEntry>,
    counts: BTreeMap<FailureKind, usize>,
}

impl FailureLedger {
    /// Create the report directory and purge stale reports from earlier runs.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| PipelineError::io(&dir, e))?;

        let listing = fs::read_dir(&dir).map_err(|e| PipelineError::io(&dir, e))?;
        for entry in listing {
            let entry = entry.map_err(|e| PipelineError::io(&dir, e))?;
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "txt") {
                fs::remove_file(&path).map_err(|e| PipelineError::io(&path, e))?;
                debug!(path = %path.display(), "removed stale failure report");
            }
        }

        Ok(Self {
            dir,
            entries: Vec::new(),
            counts: BTreeMap::new(),
        })
    }

    /// Record a failure and append it to its report file immediately.
    pub fn record(
        &mut self,
        kind: FailureKind,
        record: &RecordLocator,
        detail: Option<String>,
    ) -> Result<()> {
        let entry = FailureEntry {
            kind,
            record: record.relative().to_path_buf(),
            detail,
        };
        warn!(kind = %kind, record = %record, detail = ?entry.detail, "{}", kind.message());

        let path = self.report_path(kind);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| PipelineError::io(&path, e))?;
        writeln!(file, "{}", entry.report_line()).map_err(|e| PipelineError::io(&path, e))?;

        *self.counts.entry(kind).or_default() += 1;
        self.entries.push(entry);
        Ok(())
    }

    #[must_use]
    pub fn report_path(&self, kind: FailureKind) -> PathBuf {
        self.dir.join(kind.report_file_name())
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Entries in discovery order.
    #[must_use]
    pub fn entries(&self) -> &[FailureEntry] {
        &self.entries
    }

    /// Failure counts, sorted by kind.
    #[must_use]
    pub fn counts(&self) -> &BTreeMap<FailureKind, usize> {
        &self.counts
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
