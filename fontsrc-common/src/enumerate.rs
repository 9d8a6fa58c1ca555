//! Record enumeration over the metadata corpus.

use crate::errors::{PipelineError, Result};
use crate::types::{RecordLocator, UPSTREAM_FILE};
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Every record directory under `corpus_root` holding an upstream declaration,
/// in sorted path order.
pub fn enumerate_records(corpus_root: &Path) -> Result<Vec<RecordLocator>> {
    if !corpus_root.is_dir() {
        return Err(PipelineError::CorpusNotFound(corpus_root.to_path_buf()));
    }

    let walker = WalkDir::new(corpus_root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git");

    let mut records = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(corpus_root).to_path_buf();
            PipelineError::io(path, e.into())
        })?;
        if !entry.file_type().is_file() || entry.file_name() != UPSTREAM_FILE {
            continue;
        }
        if let Some(dir) = entry.path().parent() {
            records.push(RecordLocator::new(corpus_root, dir));
        }
    }

    records.sort();
    debug!(count = records.len(), root = %corpus_root.display(), "enumerated records");
    Ok(records)
}
