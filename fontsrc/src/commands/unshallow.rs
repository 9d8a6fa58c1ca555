//! `fontsrc unshallow`: turn a depth-limited mirror into a full clone.

use anyhow::{Result, bail};
use fontsrc_common::vcs::is_working_copy;
use fontsrc_common::{GitCli, VcsClient};
use std::path::Path;
use tracing::info;

pub fn run(dir: &Path) -> Result<u8> {
    unshallow(&GitCli::default(), dir)?;
    println!("Fetched full history for {}", dir.display());
    Ok(0)
}

fn unshallow(vcs: &dyn VcsClient, dir: &Path) -> Result<()> {
    if !is_working_copy(dir) {
        bail!("{} is not a git working copy", dir.display());
    }
    info!(dir = %dir.display(), "fetching full history");
    vcs.unshallow(dir)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fontsrc_common::vcs::{RecordingVcs, VcsCall};

    #[test]
    fn rejects_non_working_copy() {
        let tmp = tempfile::tempdir().unwrap();
        let vcs = RecordingVcs::new();
        let err = unshallow(&vcs, tmp.path()).unwrap_err();
        assert!(err.to_string().contains("not a git working copy"));
        assert!(vcs.calls().is_empty());
    }

    #[test]
    fn unshallows_existing_clone() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join(".git")).unwrap();
        let vcs = RecordingVcs::new();
        unshallow(&vcs, tmp.path()).unwrap();
        assert_eq!(
            vcs.calls(),
            [VcsCall::Unshallow {
                dest: tmp.path().to_path_buf()
            }]
        );
    }
}
