//! Operating-system facts that change how packages are built.

use crate::error::Result;
use crate::executor::{CommandExecutor, Invocation, run_checked};
use camino::Utf8Path;
use std::fmt;

/// Dist tag used on macOS, where `rpm` has no distribution macro.
pub const MACOS_DIST_TAG: &str = ".osx";

/// VCS entries excluded explicitly where tar lacks `--exclude-vcs`.
const VCS_ENTRIES: [&str; 5] = [".git", ".svn", ".hg", "CVS", ".gitignore"];

/// Broad family of the build host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsFamily {
    /// Debian and derivatives (`/etc/debian_version` present).
    Debian,
    /// Red Hat and derivatives (`/etc/redhat-release` present).
    RedHat,
    /// macOS, whose BSD tar needs explicit VCS exclusions.
    MacOs,
    /// Anything else.
    Other,
}

impl OsFamily {
    /// Detect the family of the running host.
    #[must_use]
    pub fn detect() -> Self {
        Self::detect_from(cfg!(target_os = "macos"), Utf8Path::new("/"))
    }

    /// Detect the family from marker files under `root`.
    #[must_use]
    pub fn detect_from(is_macos: bool, root: &Utf8Path) -> Self {
        if is_macos {
            Self::MacOs
        } else if root.join("etc/debian_version").is_file() {
            Self::Debian
        } else if root.join("etc/redhat-release").is_file() {
            Self::RedHat
        } else {
            Self::Other
        }
    }

    /// Human-readable family name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Debian => "Debian",
            Self::RedHat => "Red Hat",
            Self::MacOs => "macOS",
            Self::Other => "other",
        }
    }

    /// `tar` arguments that keep version-control metadata out of archives.
    #[must_use]
    pub fn vcs_exclude_flags(self) -> Vec<String> {
        match self {
            Self::MacOs => VCS_ENTRIES
                .iter()
                .map(|entry| format!("--exclude={entry}"))
                .collect(),
            Self::Debian | Self::RedHat | Self::Other => vec!["--exclude-vcs".to_owned()],
        }
    }

    /// The RPM distribution tag appended to the release, e.g. `.el9`.
    ///
    /// May be empty when the RPM toolchain defines no `dist` macro.
    ///
    /// # Errors
    ///
    /// Returns the executor's error when `rpm --eval` fails.
    pub fn dist_tag(self, executor: &dyn CommandExecutor) -> Result<String> {
        if self == Self::MacOs {
            return Ok(MACOS_DIST_TAG.to_owned());
        }
        let output = run_checked(
            executor,
            &Invocation::new("rpm").args(["--eval", "%{?dist}"]),
        )?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_owned())
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
