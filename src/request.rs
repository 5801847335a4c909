//! Build requests.

use crate::error::{ArchiveError, Result};
use crate::module_name::ModuleName;
use camino::Utf8PathBuf;
use std::fmt;
use std::str::FromStr;

/// Release number used when none is requested.
pub const DEFAULT_RELEASE: u32 = 1;

/// Artefact format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// Self-extracting shell script (`bin` or `sh`).
    ShellArchive,
    /// Debian package.
    Debian,
    /// RPM package.
    Rpm,
}

impl Format {
    /// Canonical name of the format.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ShellArchive => "sh",
            Self::Debian => "deb",
            Self::Rpm => "rpm",
        }
    }
}

impl FromStr for Format {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "bin" | "sh" => Ok(Self::ShellArchive),
            "deb" => Ok(Self::Debian),
            "rpm" => Ok(Self::Rpm),
            other => Err(ArchiveError::UnsupportedFormat {
                format: other.to_owned(),
            }),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One invocation's worth of packaging work.
///
/// # Examples
///
/// ```
/// use rerun_archive::request::{BuildRequest, Format};
///
/// let request = BuildRequest::new("bin", ["waitfor"])?.with_version("1.0.0");
/// assert_eq!(request.format, Format::ShellArchive);
/// assert_eq!(request.release, 1);
/// # Ok::<(), rerun_archive::error::ArchiveError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    /// Requested format.
    pub format: Format,
    /// Modules in request order. Duplicates are built twice.
    pub modules: Vec<ModuleName>,
    /// Output path for shell archives.
    pub file: Option<Utf8PathBuf>,
    /// Version override.
    pub version: Option<String>,
    /// Package release number.
    pub release: u32,
    /// Template directory override.
    pub template: Option<Utf8PathBuf>,
}

impl BuildRequest {
    /// Start a request for `format` covering `modules`.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::UnsupportedFormat`] for an unknown format.
    pub fn new<I, S>(format: &str, modules: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<ModuleName>,
    {
        Ok(Self {
            format: format.parse()?,
            modules: modules.into_iter().map(Into::into).collect(),
            file: None,
            version: None,
            release: DEFAULT_RELEASE,
            template: None,
        })
    }

    /// Set the shell-archive output path.
    #[must_use]
    pub fn with_file(mut self, file: impl Into<Utf8PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Set the version override. Blank values are ignored.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        let version = version.into();
        self.version = (!version.trim().is_empty()).then_some(version);
        self
    }

    /// Set the release number.
    #[must_use]
    pub fn with_release(mut self, release: u32) -> Self {
        self.release = release;
        self
    }

    /// Set the template directory.
    #[must_use]
    pub fn with_template(mut self, template: impl Into<Utf8PathBuf>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// The version override, trimmed.
    #[must_use]
    pub fn version_override(&self) -> Option<&str> {
        self.version.as_deref().map(str::trim)
    }

    /// Check request-wide invariants before any builder runs.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::NoModules`] or
    /// [`ArchiveError::InvalidRelease`].
    pub fn validate(&self) -> Result<()> {
        if self.modules.is_empty() {
            return Err(ArchiveError::NoModules);
        }
        if self.release == 0 {
            return Err(ArchiveError::InvalidRelease {
                release: self.release.to_string(),
            });
        }
        Ok(())
    }
}
