//! Upstream declaration store (`upstream.yaml`) and repository URL backfill.

use crate::types::{DeclaredSource, RecordLocator};
use serde::de::{self, Deserialize, Deserializer, IgnoredAny, MapAccess, Visitor};
use serde_yaml_ng::Value;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

/// Recognized key holding the archive URL.
pub const ARCHIVE_KEY: &str = "archive";
/// Recognized key holding the repository URL.
pub const REPOSITORY_URL_KEY: &str = "repository_url";

const GITHUB_HOST: &str = "github.com";

/// Failure reading an upstream declaration.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("{0}")]
    Shape(String),
}

/// Source of upstream-declared repository/archive URLs.
pub trait UpstreamStore {
    fn read_declaration(&self, record: &RecordLocator) -> Result<DeclaredSource, UpstreamError>;
}

/// Reads `upstream.yaml` from the record directory. A missing file declares nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsUpstreamStore;

impl UpstreamStore for FsUpstreamStore {
    fn read_declaration(&self, record: &RecordLocator) -> Result<DeclaredSource, UpstreamError> {
        let path = record.upstream_path();
        if !path.is_file() {
            return Ok(DeclaredSource::default());
        }
        let text = read_text(&path)?;
        Ok(parse_declaration(&text)?.declared)
    }
}

fn read_text(path: &Path) -> Result<String, UpstreamError> {
    fs::read_to_string(path).map_err(|source| UpstreamError::Read {
        path: path.display().to_string(),
        source,
    })
}

/// Parsed view of an upstream document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpstreamDeclaration {
    pub declared: DeclaredSource,
    /// Whether the `repository_url` key is present at all (even if null).
    pub has_repository_key: bool,
}

/// Only the recognized keys are materialized. Every other value is skipped
/// unread, so duplicates among unrecognized keys are accepted and a repeated
/// recognized key keeps its last value.
pub fn parse_declaration(text: &str) -> Result<UpstreamDeclaration, UpstreamError> {
    let raw: RawDeclaration = serde_yaml_ng::from_str(text)?;
    let string_field = |key: &str, value: Option<Value>| -> Result<Option<String>, UpstreamError> {
        match value {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(_) => Err(UpstreamError::Shape(format!("`{key}` must be a string"))),
        }
    };

    let has_repository_key = raw.repository_url.is_some();
    Ok(UpstreamDeclaration {
        declared: DeclaredSource::new(
            string_field(REPOSITORY_URL_KEY, raw.repository_url)?,
            string_field(ARCHIVE_KEY, raw.archive)?,
        ),
        has_repository_key,
    })
}

/// Recognized keys of an upstream document. `Some(Value::Null)` is a present
/// but null key; `None` is an absent one.
#[derive(Debug, Default)]
struct RawDeclaration {
    archive: Option<Value>,
    repository_url: Option<Value>,
}

impl<'de> Deserialize<'de> for RawDeclaration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(RawDeclarationVisitor)
    }
}

struct RawDeclarationVisitor;

impl<'de> Visitor<'de> for RawDeclarationVisitor {
    type Value = RawDeclaration;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a mapping")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(RawDeclaration::default())
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(RawDeclaration::default())
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut raw = RawDeclaration::default();
        while let Some(key) = map.next_key::<Value>()? {
            match key.as_str() {
                Some(ARCHIVE_KEY) => raw.archive = Some(map.next_value()?),
                Some(REPOSITORY_URL_KEY) => raw.repository_url = Some(map.next_value()?),
                _ => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        Ok(raw)
    }
}

/// Repository URL implied by a GitHub archive URL.
///
/// Keeps the first two path segments (owner and repository):
/// `https://github.com/owner/name/releases/download/v1/x.zip` becomes
/// `https://github.com/owner/name`. Other hosts infer nothing.
#[must_use]
pub fn infer_repository_url(archive_url: &str) -> Option<String> {
    let url = Url::parse(archive_url).ok()?;
    if url.scheme() != "https" || url.host_str() != Some(GITHUB_HOST) {
        return None;
    }
    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
    let owner = segments.next()?;
    let name = segments.next()?;
    Some(format!("https://{GITHUB_HOST}/{owner}/{name}"))
}

/// Outcome of a backfill pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackfillReport {
    /// Files that received a `repository_url` line.
    pub fixed: Vec<PathBuf>,
    /// Files whose declared repository disagrees with the archive inference.
    pub mismatches: Vec<BackfillMismatch>,
    /// Files that could not be parsed, with the error text.
    pub unreadable: Vec<(PathBuf, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackfillMismatch {
    pub path: PathBuf,
    pub declared: Option<String>,
    pub inferred: String,
}

/// Append `repository_url` to upstream files that only point at a GitHub archive.
///
/// The line is appended rather than re-serializing the document so unrelated
/// fields and comments stay byte-for-byte identical. A declared repository
/// that differs from the inference is only reported; declared data wins.
pub fn backfill_repository_urls(records: &[RecordLocator], dry_run: bool) -> BackfillReport {
    let mut report = BackfillReport::default();

    for record in records {
        let path = record.upstream_path();
        let text = match read_text(&path) {
            Ok(t) => t,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable upstream file");
                report.unreadable.push((path, e.to_string()));
                continue;
            }
        };
        let parsed = match parse_declaration(&text) {
            Ok(p) => p,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load upstream file");
                report.unreadable.push((path, e.to_string()));
                continue;
            }
        };

        let Some(inferred) = parsed
            .declared
            .archive_url
            .as_deref()
            .and_then(infer_repository_url)
        else {
            continue;
        };

        if !parsed.has_repository_key {
            if !dry_run && let Err(e) = append_repository_url(&path, &text, &inferred) {
                warn!(path = %path.display(), error = %e, "failed to append repository_url");
                report.unreadable.push((path, e.to_string()));
                continue;
            }
            debug!(path = %path.display(), url = %inferred, dry_run, "backfilled repository_url");
            report.fixed.push(path);
        } else if parsed.declared.repository_url.as_deref() != Some(inferred.as_str()) {
            warn!(
                path = %path.display(),
                declared = ?parsed.declared.repository_url,
                inferred = %inferred,
                "declared repository_url differs from archive"
            );
            report.mismatches.push(BackfillMismatch {
                path,
                declared: parsed.declared.repository_url,
                inferred,
            });
        }
    }

    info!(fixed = report.fixed.len(), "repository_url backfill complete");
    report
}

fn append_repository_url(path: &Path, existing: &str, url: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().append(true).open(path)?;
    if !existing.is_empty() && !existing.ends_with('\n') {
        file.write_all(b"\n")?;
    }
    writeln!(file, "{REPOSITORY_URL_KEY}: {url}")
}
