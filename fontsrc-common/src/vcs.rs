//! Version control client used by the fetch executor.
//!
//! [`GitCli`] shells out to `git`; [`RecordingVcs`] is a deterministic
//! in-process double that records calls and materializes directories so the
//! pipeline can be exercised without a network.

use crate::util::{flatten_lines, mask_url_credentials};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Directory whose presence marks a working copy.
pub const VCS_METADATA_DIR: &str = ".git";

/// A failed version control invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFailure {
    /// Rendered command line, credentials masked.
    pub command: String,
    /// Captured stdout and stderr.
    pub output: String,
}

impl CommandFailure {
    /// Single-line form for failure reports.
    #[must_use]
    pub fn detail(&self) -> String {
        let output = flatten_lines(&self.output);
        if output.is_empty() {
            self.command.clone()
        } else {
            format!("{} | {}", self.command, output)
        }
    }
}

impl fmt::Display for CommandFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}` failed: {}", self.command, self.output.trim())
    }
}

impl std::error::Error for CommandFailure {}

/// Operations the executor needs from version control.
pub trait VcsClient {
    /// Clone `url` into `dest`. `depth == 0` means full history.
    fn clone_repo(&self, url: &str, dest: &Path, depth: u32) -> Result<(), CommandFailure>;

    /// Update an existing working copy.
    fn pull(&self, dest: &Path) -> Result<(), CommandFailure>;

    /// Fetch the full history of a shallow working copy.
    fn unshallow(&self, dest: &Path) -> Result<(), CommandFailure>;
}

/// Whether `dir` holds version control metadata.
#[must_use]
pub fn is_working_copy(dir: &Path) -> bool {
    dir.join(VCS_METADATA_DIR).is_dir()
}

// ── git CLI ────────────────────────────────────────────────────────────────

/// Runs the `git` binary synchronously.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
}

impl Default for GitCli {
    fn default() -> Self {
        Self {
            program: PathBuf::from("git"),
        }
    }
}

impl GitCli {
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn clone_args(url: &str, dest: &Path, depth: u32) -> Vec<String> {
        let mut args = vec!["clone".to_string()];
        if depth > 0 {
            args.push(format!("--depth={depth}"));
        }
        args.push(url.to_string());
        args.push(dest.display().to_string());
        args
    }

    fn in_dir_args(dest: &Path, rest: &[&str]) -> Vec<String> {
        let mut args = vec!["-C".to_string(), dest.display().to_string()];
        args.extend(rest.iter().map(|s| (*s).to_string()));
        args
    }

    fn run(&self, args: &[String]) -> Result<(), CommandFailure> {
        let command = mask_url_credentials(&format!(
            "{} {}",
            self.program.display(),
            args.join(" ")
        ));
        info!("{}", command);

        let output = Command::new(&self.program)
            .args(args)
            // Fail instead of blocking on a credential prompt.
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .map_err(|e| CommandFailure {
                command: command.clone(),
                output: e.to_string(),
            })?;

        if output.status.success() {
            debug!(command = %command, "command succeeded");
            return Ok(());
        }

        let mut captured = String::from_utf8_lossy(&output.stdout).into_owned();
        captured.push_str(&String::from_utf8_lossy(&output.stderr));
        if let Some(code) = output.status.code() {
            captured.push_str(&format!("\nexit status {code}"));
        }
        Err(CommandFailure {
            command,
            output: mask_url_credentials(&captured),
        })
    }
}

impl VcsClient for GitCli {
    fn clone_repo(&self, url: &str, dest: &Path, depth: u32) -> Result<(), CommandFailure> {
        self.run(&Self::clone_args(url, dest, depth))
    }

    fn pull(&self, dest: &Path) -> Result<(), CommandFailure> {
        self.run(&Self::in_dir_args(dest, &["pull"]))
    }

    fn unshallow(&self, dest: &Path) -> Result<(), CommandFailure> {
        self.run(&Self::in_dir_args(dest, &["fetch", "--unshallow"]))
    }
}

// ── Recording double ───────────────────────────────────────────────────────

/// One call received by [`RecordingVcs`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VcsCall {
    Clone { url: String, dest: PathBuf, depth: u32 },
    Pull { dest: PathBuf },
    Unshallow { dest: PathBuf },
}

#[derive(Debug, Default)]
struct RecordingState {
    calls: Vec<VcsCall>,
    failing_urls: Vec<String>,
    fail_pulls: bool,
    files: Vec<(PathBuf, String)>,
}

/// Deterministic in-memory VCS for tests.
///
/// A successful clone creates `dest/.git` plus any files registered with
/// [`RecordingVcs::with_file`]; a pull touches nothing.
#[derive(Debug, Clone, Default)]
pub struct RecordingVcs {
    state: Arc<Mutex<RecordingState>>,
}

impl RecordingVcs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clones of `url` fail.
    pub fn fail_url(self, url: impl Into<String>) -> Self {
        self.lock().failing_urls.push(url.into());
        self
    }

    /// Every pull fails.
    pub fn fail_pulls(self) -> Self {
        self.lock().fail_pulls = true;
        self
    }

    /// File written (relative to the clone) on every successful clone.
    pub fn with_file(self, relative: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        self.lock().files.push((relative.into(), contents.into()));
        self
    }

    /// Snapshot of all calls received.
    #[must_use]
    pub fn calls(&self) -> Vec<VcsCall> {
        self.lock().calls.clone()
    }

    #[must_use]
    pub fn clone_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, VcsCall::Clone { .. }))
            .count()
    }

    #[must_use]
    pub fn pull_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, VcsCall::Pull { .. }))
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RecordingState> {
        self.state.lock().expect("recording vcs mutex poisoned")
    }
}

impl VcsClient for RecordingVcs {
    fn clone_repo(&self, url: &str, dest: &Path, depth: u32) -> Result<(), CommandFailure> {
        let mut state = self.lock();
        state.calls.push(VcsCall::Clone {
            url: url.to_string(),
            dest: dest.to_path_buf(),
            depth,
        });
        let command = format!("git clone --depth={depth} {url} {}", dest.display());
        if state.failing_urls.iter().any(|u| u == url) {
            return Err(CommandFailure {
                command,
                output: "fatal: repository not found".to_string(),
            });
        }

        let io_failure = |e: std::io::Error| CommandFailure {
            command: command.clone(),
            output: e.to_string(),
        };
        fs::create_dir_all(dest.join(VCS_METADATA_DIR)).map_err(io_failure)?;
        for (relative, contents) in &state.files {
            let path = dest.join(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(io_failure)?;
            }
            fs::write(&path, contents).map_err(io_failure)?;
        }
        Ok(())
    }

    fn pull(&self, dest: &Path) -> Result<(), CommandFailure> {
        let mut state = self.lock();
        state.calls.push(VcsCall::Pull {
            dest: dest.to_path_buf(),
        });
        if state.fail_pulls {
            return Err(CommandFailure {
                command: format!("git -C {} pull", dest.display()),
                output: "fatal: not possible to fast-forward".to_string(),
            });
        }
        Ok(())
    }

    fn unshallow(&self, dest: &Path) -> Result<(), CommandFailure> {
        self.lock().calls.push(VcsCall::Unshallow {
            dest: dest.to_path_buf(),
        });
        Ok(())
    }
}
