#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Corpus and sources tree inside one temporary directory.
pub struct CorpusFixture {
    pub dir: TempDir,
    pub corpus: PathBuf,
    pub sources: PathBuf,
}

impl CorpusFixture {
    pub fn new() -> Self {
        crate::test_log!("FIXTURE: creating corpus");

        let dir = TempDir::new().expect("Failed to create temp dir");
        let corpus = dir.path().join("fonts");
        let sources = dir.path().join("sources");
        fs::create_dir_all(&corpus).expect("Failed to create corpus dir");

        Self {
            dir,
            corpus,
            sources,
        }
    }

    /// Add a record at `rel` (e.g. `ofl/foo`) with the given documents.
    ///
    /// `upstream.yaml` is always written since it marks the record; `None`
    /// writes an empty document.
    pub fn record(&self, rel: &str, metadata: &str, upstream: Option<&str>) -> &Self {
        let dir = self.corpus.join(rel);
        fs::create_dir_all(&dir).expect("Failed to create record dir");
        fs::write(dir.join("METADATA.pb"), metadata).expect("Failed to write METADATA.pb");
        fs::write(dir.join("upstream.yaml"), upstream.unwrap_or(""))
            .expect("Failed to write upstream.yaml");
        self
    }

    pub fn failures_dir(&self) -> PathBuf {
        self.sources.join("failures")
    }

    pub fn report(&self, kind: &str) -> Option<String> {
        fs::read_to_string(self.failures_dir().join(format!("{kind}.txt"))).ok()
    }

    pub fn mirror(&self, rel: &str) -> PathBuf {
        self.sources.join(rel)
    }
}

/// `METADATA.pb` declaring a repository URL.
pub fn repo_metadata(name: &str, url: &str) -> String {
    format!(
        "name: \"{name}\"\ndesigner: \"Someone\"\nlicense: \"OFL\"\nsource {{\n  repository_url: \"{url}\"\n}}\n"
    )
}

/// Relative file paths (and contents) under `root`, sorted.
pub fn tree_snapshot(root: &Path) -> Vec<(PathBuf, Vec<u8>)> {
    let mut files: Vec<_> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e.path().strip_prefix(root).unwrap().to_path_buf();
            let bytes = fs::read(e.path()).unwrap();
            (rel, bytes)
        })
        .collect();
    files.sort();
    files
}
