//! Fetch deduplication and execution.
//!
//! Each resolved repository URL is fetched at most once per run. The first
//! record resolving to a URL clones (or pulls) into its own mirror directory;
//! every later record with the same URL gets a local copy of that directory.

use crate::errors::{FailureKind, Result};
use crate::types::{Outcome, RecordLocator};
use crate::util::mask_url_credentials;
use crate::vcs::{VcsClient, is_working_copy};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Directory names never copied between mirrors.
pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &["venv", ".venv"];

/// Repository URL → first directory materialized for it in this run.
///
/// Lives for one pipeline run. If fetches are ever parallelized this must
/// become a synchronized table where the first caller for a URL fetches and
/// later callers wait for it.
#[derive(Debug, Default)]
pub struct FetchState {
    repos: HashMap<String, PathBuf>,
}

impl FetchState {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, url: &str) -> Option<&Path> {
        self.repos.get(url).map(PathBuf::as_path)
    }

    /// First writer wins; returns whether `dir` was registered.
    pub fn register(&mut self, url: &str, dir: &Path) -> bool {
        if self.repos.contains_key(url) {
            return false;
        }
        self.repos.insert(url.to_string(), dir.to_path_buf());
        true
    }

    pub fn len(&self) -> usize {
        self.repos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }
}

/// Executor settings.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Pull working copies that already exist; otherwise leave them untouched.
    pub pull_existing: bool,
    /// Clone depth; 0 clones full history.
    pub clone_depth: u32,
    /// Directory names skipped when copying a mirror.
    pub excluded_dir_names: Vec<String>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            pull_existing: true,
            clone_depth: 1,
            excluded_dir_names: DEFAULT_EXCLUDED_DIRS.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

/// What the executor did for a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchEvent {
    Cloned,
    Pulled,
    /// Existing working copy left alone (`pull_existing = false`).
    PullSkipped,
    /// Copied from the mirror of an earlier record with the same URL.
    LocalCopy,
}

/// Mirror directory for a record: `<sources_root>/<category>/<record name>`.
///
/// Fails with an invariant violation when the record is not under a known
/// license category.
pub fn destination_dir(sources_root: &Path, record: &RecordLocator) -> Result<PathBuf> {
    let category = record.license_category()?;
    Ok(sources_root.join(category.as_str()).join(record.repo_name()))
}

/// Runs clone / pull / local copy against a [`VcsClient`].
pub struct Fetcher<'a> {
    vcs: &'a dyn VcsClient,
    options: FetchOptions,
    state: FetchState,
}

impl<'a> Fetcher<'a> {
    pub fn new(vcs: &'a dyn VcsClient, options: FetchOptions) -> Self {
        Self {
            vcs,
            options,
            state: FetchState::new(),
        }
    }

    #[must_use]
    pub fn state(&self) -> &FetchState {
        &self.state
    }

    /// Materialize `url` at `dest`.
    ///
    /// Failures come back as an `Unresolved { cmd_fail }` outcome carrying the
    /// command and its output. The URL is registered only after a fetch fully
    /// succeeds.
    pub fn fetch(&mut self, url: &str, dest: &Path) -> std::result::Result<FetchEvent, Outcome> {
        if let Some(existing) = self.state.get(url) {
            let existing = existing.to_path_buf();
            info!(from = %existing.display(), to = %dest.display(), "copy");
            return self
                .local_copy(&existing, dest)
                .map(|()| FetchEvent::LocalCopy)
                .map_err(|e| {
                    Outcome::unresolved_with(
                        FailureKind::CmdFail,
                        format!("copy {} to {}: {e}", existing.display(), dest.display()),
                    )
                });
        }

        let event = if is_working_copy(dest) {
            if self.options.pull_existing {
                self.vcs.pull(dest).map_err(|f| {
                    Outcome::unresolved_with(FailureKind::CmdFail, f.detail())
                })?;
                FetchEvent::Pulled
            } else {
                debug!(dest = %dest.display(), "existing clone left untouched");
                FetchEvent::PullSkipped
            }
        } else {
            self.prepare_clone_target(dest).map_err(|e| {
                Outcome::unresolved_with(
                    FailureKind::CmdFail,
                    format!("prepare {}: {e}", dest.display()),
                )
            })?;
            self.vcs
                .clone_repo(url, dest, self.options.clone_depth)
                .map_err(|f| Outcome::unresolved_with(FailureKind::CmdFail, f.detail()))?;
            FetchEvent::Cloned
        };

        if !self.state.register(url, dest) {
            debug!(url = %mask_url_credentials(url), "already registered");
        }
        Ok(event)
    }

    /// Clone targets must not exist (a non-git leftover would make git refuse).
    fn prepare_clone_target(&self, dest: &Path) -> io::Result<()> {
        if dest.exists() {
            fs::remove_dir_all(dest)?;
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    fn local_copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        if to.exists() {
            fs::remove_dir_all(to)?;
        }
        copy_tree(from, to, &self.options.excluded_dir_names)
    }
}

/// Recursively copy `from` into `to`, skipping directories named in `excluded`.
pub fn copy_tree(from: &Path, to: &Path, excluded: &[String]) -> io::Result<()> {
    let walker = WalkDir::new(from)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || !e.file_type().is_dir()
                || !excluded.iter().any(|x| e.file_name() == x.as_str())
        });

    for entry in walker {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .map_err(|e| io::Error::other(e.to_string()))?;
        let target = to.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    let link = fs::read_link(src)?;
    std::os::unix::fs::symlink(link, dst)
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    fs::copy(src, dst).map(|_| ())
}
