//! Core data model shared by every pipeline stage.

use crate::errors::{FailureKind, PipelineError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// Metadata file name inside each record directory.
pub const METADATA_FILE: &str = "METADATA.pb";
/// Upstream declaration file name inside each record directory.
pub const UPSTREAM_FILE: &str = "upstream.yaml";

/// License category directory a record lives under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseCategory {
    Apache,
    Ofl,
    Ufl,
}

impl LicenseCategory {
    pub const ALL: [LicenseCategory; 3] = [Self::Apache, Self::Ofl, Self::Ufl];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Apache => "apache",
            Self::Ofl => "ofl",
            Self::Ufl => "ufl",
        }
    }

    /// Validated constructor; `record` is only used for the error message.
    pub fn parse(name: &str, record: &Path) -> Result<Self, PipelineError> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == name)
            .ok_or_else(|| PipelineError::UnknownLicenseCategory {
                category: name.to_string(),
                record: record.to_path_buf(),
            })
    }
}

impl fmt::Display for LicenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Locator of one record: its directory inside the corpus.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordLocator {
    corpus_root: PathBuf,
    record_dir: PathBuf,
}

impl RecordLocator {
    pub fn new(corpus_root: impl Into<PathBuf>, record_dir: impl Into<PathBuf>) -> Self {
        Self {
            corpus_root: corpus_root.into(),
            record_dir: record_dir.into(),
        }
    }

    #[must_use]
    pub fn record_dir(&self) -> &Path {
        &self.record_dir
    }

    /// Corpus-relative path, as written to failure reports.
    #[must_use]
    pub fn relative(&self) -> &Path {
        self.record_dir
            .strip_prefix(&self.corpus_root)
            .unwrap_or(&self.record_dir)
    }

    #[must_use]
    pub fn metadata_path(&self) -> PathBuf {
        self.record_dir.join(METADATA_FILE)
    }

    #[must_use]
    pub fn upstream_path(&self) -> PathBuf {
        self.record_dir.join(UPSTREAM_FILE)
    }

    /// Record directory name, also the mirror directory name.
    #[must_use]
    pub fn repo_name(&self) -> String {
        self.record_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// License category from the parent directory name.
    pub fn license_category(&self) -> Result<LicenseCategory, PipelineError> {
        let name = self
            .record_dir
            .parent()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        LicenseCategory::parse(&name, self.relative())
    }
}

impl fmt::Display for RecordLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.relative().display())
    }
}

/// What one store declares about a record's source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclaredSource {
    pub repository_url: Option<String>,
    pub archive_url: Option<String>,
}

impl DeclaredSource {
    /// Treats empty strings as absent.
    pub fn new(repository_url: Option<String>, archive_url: Option<String>) -> Self {
        Self {
            repository_url: repository_url.filter(|s| !s.is_empty()),
            archive_url: archive_url.filter(|s| !s.is_empty()),
        }
    }
}

/// Distinct repository and archive URLs asserted across both stores.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceFacts {
    pub repo_urls: BTreeSet<String>,
    pub archive_urls: BTreeSet<String>,
}

impl SourceFacts {
    pub fn absorb(&mut self, declared: DeclaredSource) {
        if let Some(url) = declared.repository_url {
            self.repo_urls.insert(url);
        }
        if let Some(url) = declared.archive_url {
            self.archive_urls.insert(url);
        }
    }

    pub fn from_urls<R, A>(repo_urls: R, archive_urls: A) -> Self
    where
        R: IntoIterator,
        R::Item: Into<String>,
        A: IntoIterator,
        A::Item: Into<String>,
    {
        Self {
            repo_urls: repo_urls.into_iter().map(Into::into).collect(),
            archive_urls: archive_urls.into_iter().map(Into::into).collect(),
        }
    }
}

/// Decision for one record. Exactly one per record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Resolved { repository_url: String },
    Unresolved { kind: FailureKind, detail: Option<String> },
}

impl Outcome {
    pub fn unresolved(kind: FailureKind) -> Self {
        Self::Unresolved { kind, detail: None }
    }

    pub fn unresolved_with(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self::Unresolved {
            kind,
            detail: Some(detail.into()),
        }
    }

    #[must_use]
    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            Self::Resolved { .. } => None,
            Self::Unresolved { kind, .. } => Some(*kind),
        }
    }
}
