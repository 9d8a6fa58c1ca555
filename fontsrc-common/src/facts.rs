//! Source fact extraction: merge what both stores declare about one record.

use crate::errors::FailureKind;
use crate::metadata::MetadataStore;
use crate::types::{Outcome, RecordLocator, SourceFacts};
use crate::upstream::UpstreamStore;
use tracing::debug;

/// Collect the distinct repository and archive URLs declared for `record`.
///
/// The upstream declaration is read first; if it fails to parse the record
/// is classified as `bad_yaml` and the metadata store is never consulted.
/// A metadata parse failure classifies as `unparseable_metadata_file`.
/// Read-only.
pub fn extract_facts(
    record: &RecordLocator,
    metadata: &dyn MetadataStore,
    upstream: &dyn UpstreamStore,
) -> Result<SourceFacts, Outcome> {
    let from_upstream = upstream
        .read_declaration(record)
        .map_err(|e| Outcome::unresolved_with(FailureKind::BadYaml, e.to_string()))?;

    let from_metadata = metadata
        .read_source(record)
        .map_err(|e| Outcome::unresolved_with(FailureKind::UnparseableMetadata, e.to_string()))?;

    let mut facts = SourceFacts::default();
    facts.absorb(from_metadata);
    facts.absorb(from_upstream);

    debug!(
        record = %record,
        repo_urls = facts.repo_urls.len(),
        archive_urls = facts.archive_urls.len(),
        "extracted source facts"
    );
    Ok(facts)
}
