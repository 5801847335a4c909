//! The host framework the archives are built for.
//!
//! Builders only ever read two facts about the Rerun framework that invokes
//! them: its version string (RPM builds compare major versions against it)
//! and the path of its executable (shell archives bundle a copy).

use crate::error::{ArchiveError, Result};
use crate::metadata::ModuleVersion;
use camino::{Utf8Path, Utf8PathBuf};

/// Name of the framework executable looked up on `PATH`.
pub const HOST_EXECUTABLE: &str = "rerun";

/// Read-only facts about the invoking framework.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostFramework {
    version: Option<String>,
    executable: Option<Utf8PathBuf>,
}

impl HostFramework {
    /// Describe a framework with the given version and executable path.
    #[must_use]
    pub fn new(version: Option<String>, executable: Option<Utf8PathBuf>) -> Self {
        Self {
            version: version.filter(|v| !v.trim().is_empty()),
            executable,
        }
    }

    /// Like [`HostFramework::new`], but falls back to finding
    /// [`HOST_EXECUTABLE`] on `PATH` when no executable is given.
    #[must_use]
    pub fn locate(version: Option<String>, executable: Option<Utf8PathBuf>) -> Self {
        let executable = executable.or_else(|| {
            which::which(HOST_EXECUTABLE)
                .ok()
                .and_then(|p| Utf8PathBuf::try_from(p).ok())
        });
        Self::new(version, executable)
    }

    /// The framework's version string.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::HostVersionUnknown`] when no version was
    /// supplied.
    pub fn version(&self) -> Result<&str> {
        self.version
            .as_deref()
            .map(str::trim)
            .ok_or(ArchiveError::HostVersionUnknown)
    }

    /// The framework's major version number.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::HostVersionUnknown`] or
    /// [`ArchiveError::InvalidVersion`].
    pub fn major(&self) -> Result<u32> {
        ModuleVersion::parse_major(self.version()?)
    }

    /// Path to the framework executable, checked to be an existing file.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::HostExecutableNotFound`] when no path is
    /// known or the path does not name a file.
    pub fn executable(&self) -> Result<&Utf8Path> {
        let path = self
            .executable
            .as_deref()
            .ok_or_else(|| ArchiveError::HostExecutableNotFound {
                reason: format!("set RERUN or put {HOST_EXECUTABLE} on PATH"),
            })?;
        if !path.is_file() {
            return Err(ArchiveError::HostExecutableNotFound {
                reason: format!("{path} is not a file"),
            });
        }
        Ok(path)
    }
}
