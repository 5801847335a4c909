//! Scoped staging directories.
//!
//! Every build stages its intermediate files in a [`StagingWorkspace`]. The
//! directory is removed when the workspace is dropped, whether the build
//! finished or bailed out with `?` halfway through, so failed builds leave
//! no temporary trees behind.

use crate::error::Result;
use crate::fsutil::{make_writable, utf8_path};
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, warn};
use tempfile::TempDir;

/// Prefix of every staging directory name.
pub const WORKSPACE_PREFIX: &str = "rerun.archive.";

/// A uniquely named temporary directory owned by one build.
#[derive(Debug)]
pub struct StagingWorkspace {
    dir: Option<TempDir>,
    path: Utf8PathBuf,
}

impl StagingWorkspace {
    /// Create a workspace in the system temporary directory.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::ArchiveError::Io`] if the directory cannot be
    /// created, or [`crate::error::ArchiveError::NonUtf8Path`] if the
    /// temporary directory path is not UTF-8.
    pub fn create() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir()?;
        Self::from_tempdir(dir)
    }

    fn from_tempdir(dir: TempDir) -> Result<Self> {
        let path = utf8_path(dir.path().to_path_buf())?;
        debug!("created staging workspace {path}");
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    /// Root of the workspace.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// A path inside the workspace.
    #[must_use]
    pub fn join(&self, relative: impl AsRef<Utf8Path>) -> Utf8PathBuf {
        self.path.join(relative)
    }

    /// Create `relative` (and its parents) inside the workspace.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::ArchiveError::Io`] on failure.
    pub fn create_dir(&self, relative: impl AsRef<Utf8Path>) -> Result<Utf8PathBuf> {
        let dir = self.join(relative);
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Normalise permissions and delete the workspace, reporting failures.
    ///
    /// Dropping the workspace does the same but can only log problems.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::ArchiveError::Io`] if the tree cannot be
    /// removed.
    pub fn close(mut self) -> Result<()> {
        match self.dir.take() {
            Some(dir) => {
                make_writable(dir.path())?;
                dir.close()?;
                debug!("removed staging workspace {}", self.path);
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl Drop for StagingWorkspace {
    fn drop(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };
        if let Err(err) = make_writable(dir.path()) {
            warn!("could not normalise permissions in {}: {err}", self.path);
        }
        if let Err(err) = dir.close() {
            warn!("could not remove staging workspace {}: {err}", self.path);
        }
    }
}
