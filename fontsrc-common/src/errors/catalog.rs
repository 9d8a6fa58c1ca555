//! Failure catalog for source acquisition.
//!
//! Every record that cannot be mirrored lands in exactly one failure kind.
//! Kinds are stable strings: each maps 1:1 to a report file under
//! `sources/failures/<kind>.txt`, so renaming one breaks downstream triage.
//!
//! | Kind                         | Raised by         | Meaning                                   |
//! |------------------------------|-------------------|-------------------------------------------|
//! | `unparseable_metadata_file`  | fact extraction   | METADATA.pb could not be parsed           |
//! | `bad_yaml`                   | fact extraction   | upstream.yaml could not be parsed         |
//! | `inconsistent_repo_urls`     | resolution policy | stores disagree on the repository URL     |
//! | `inconsistent_archive_urls`  | resolution policy | stores disagree on the archive URL        |
//! | `no_source`                  | resolution policy | neither store declares anything           |
//! | `archive_only`               | resolution policy | archive declared, no repository           |
//! | `denylisted_repo_url`        | resolution policy | repository needs interactive auth         |
//! | `cmd_fail`                   | fetch executor    | clone, pull or local copy failed          |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Failure taxonomy covering every unresolved or failed record.
///
/// Ordering follows the kind string, which is how summaries are sorted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// METADATA.pb is missing or not valid protobuf text format
    #[serde(rename = "unparseable_metadata_file")]
    UnparseableMetadata,
    /// upstream.yaml is not valid YAML (or not a mapping)
    BadYaml,
    /// More than one distinct repository URL declared
    InconsistentRepoUrls,
    /// More than one distinct archive URL declared
    InconsistentArchiveUrls,
    /// No repository or archive URL anywhere
    NoSource,
    /// Archive URL declared without a repository URL
    ArchiveOnly,
    /// Repository URL is on the denylist
    DenylistedRepoUrl,
    /// A version control command or local copy failed
    #[serde(alias = "git_fail")]
    CmdFail,
}

impl FailureKind {
    /// All kinds in stable reporting order.
    pub const ALL: [FailureKind; 8] = [
        FailureKind::UnparseableMetadata,
        FailureKind::BadYaml,
        FailureKind::InconsistentRepoUrls,
        FailureKind::InconsistentArchiveUrls,
        FailureKind::NoSource,
        FailureKind::ArchiveOnly,
        FailureKind::DenylistedRepoUrl,
        FailureKind::CmdFail,
    ];

    /// Stable string form, also the report file stem.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnparseableMetadata => "unparseable_metadata_file",
            Self::BadYaml => "bad_yaml",
            Self::InconsistentRepoUrls => "inconsistent_repo_urls",
            Self::InconsistentArchiveUrls => "inconsistent_archive_urls",
            Self::NoSource => "no_source",
            Self::ArchiveOnly => "archive_only",
            Self::DenylistedRepoUrl => "denylisted_repo_url",
            Self::CmdFail => "cmd_fail",
        }
    }

    /// Report file name for this kind.
    #[must_use]
    pub fn report_file_name(self) -> String {
        format!("{}.txt", self.as_str())
    }

    /// Short human-readable description.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::UnparseableMetadata => "metadata file could not be parsed",
            Self::BadYaml => "upstream declaration could not be parsed",
            Self::InconsistentRepoUrls => "metadata and upstream declare different repositories",
            Self::InconsistentArchiveUrls => "metadata and upstream declare different archives",
            Self::NoSource => "no repository or archive declared",
            Self::ArchiveOnly => "archive declared without a repository",
            Self::DenylistedRepoUrl => "repository requires interactive authentication",
            Self::CmdFail => "fetch command failed",
        }
    }

    /// Suggested triage step for the kind.
    #[must_use]
    pub const fn remediation(self) -> &'static str {
        match self {
            Self::UnparseableMetadata => "Fix the METADATA.pb syntax in the corpus",
            Self::BadYaml => "Fix the upstream.yaml syntax in the corpus",
            Self::InconsistentRepoUrls | Self::InconsistentArchiveUrls => {
                "Make METADATA.pb and upstream.yaml agree"
            }
            Self::NoSource => "Declare a repository_url for the family",
            Self::ArchiveOnly => "Run `fontsrc backfill` or declare repository_url by hand",
            Self::DenylistedRepoUrl => "Fetch the repository manually with credentials",
            Self::CmdFail => "Inspect the captured command output and retry",
        }
    }
}

impl Ord for FailureKind {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl PartialOrd for FailureKind {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown failure kind string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown failure kind '{0}'")]
pub struct UnknownFailureKind(pub String);

impl FromStr for FailureKind {
    type Err = UnknownFailureKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "git_fail" {
            return Ok(Self::CmdFail);
        }
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownFailureKind(s.to_string()))
    }
}
