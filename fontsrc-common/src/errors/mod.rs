//! Error types for fontsrc.
//!
//! Two layers:
//!
//! | Type            | Scope   | Effect                                        |
//! |-----------------|---------|-----------------------------------------------|
//! | `FailureKind`   | record  | logged to the failure ledger, run continues   |
//! | `PipelineError` | process | aborts the run, exit status 2                 |

pub mod catalog;

pub use catalog::{FailureKind, UnknownFailureKind};

use std::path::PathBuf;
use thiserror::Error;

/// Process-fatal pipeline errors.
///
/// Record-level problems never surface here; they are classified into a
/// [`FailureKind`] and routed to the ledger instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A record sits under a directory that is not a known license category.
    /// The corpus is outside the model this pipeline assumes; not retryable.
    #[error("unknown license category '{category}' for record {record}")]
    UnknownLicenseCategory { category: String, record: PathBuf },

    /// Filesystem error on pipeline-owned state (corpus walk, failure reports).
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Corpus root does not exist or is not a directory.
    #[error("corpus root not found: {}", .0.display())]
    CorpusNotFound(PathBuf),
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Invariant violations indicate corpus corruption, not a transient fault.
    #[must_use]
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::UnknownLicenseCategory { .. })
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
