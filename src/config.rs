//! Packaging configuration.
//!
//! Debian and RPM packages carry facts that do not belong to any single
//! module: who maintains the packages, where module homepages live, the
//! framework package every module depends on, and where modules are
//! installed. `PackagingConfig` captures them. Values are deserialised from
//! a TOML file when one is present and fall back to the defaults below
//! otherwise, so a bare installation builds packages without any setup.

use crate::error::{ArchiveError, Result};
use crate::fsutil::utf8_path;
use camino::{Utf8Path, Utf8PathBuf};
use directories_next::ProjectDirs;
use log::debug;
use serde::Deserialize;

/// File name of the per-user configuration file.
pub const CONFIG_FILE_NAME: &str = "archive.toml";

/// Settings shared by the package builders.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PackagingConfig {
    /// Package maintainer in `Name <email>` form.
    pub maintainer: String,
    /// Base URL; a module's homepage is `<homepage_base>/<name>`.
    pub homepage_base: String,
    /// Package providing the framework itself; every module depends on it.
    pub framework_package: String,
    /// Holder named in generated copyright files.
    pub copyright_holder: String,
    /// First year of the copyright range; the range ends at the build year.
    pub copyright_start_year: i32,
    /// Directory modules are installed under, one subdirectory per module.
    pub install_root: Utf8PathBuf,
}

impl Default for PackagingConfig {
    fn default() -> Self {
        Self {
            maintainer: "Rerun Maintainers <rerun-discuss@googlegroups.com>".to_owned(),
            homepage_base: "https://github.com/rerun-modules".to_owned(),
            framework_package: "rerun".to_owned(),
            copyright_holder: "Rerun Contributors".to_owned(),
            copyright_start_year: 2012,
            install_root: Utf8PathBuf::from("/usr/lib/rerun/modules"),
        }
    }
}

impl PackagingConfig {
    /// Load the configuration.
    ///
    /// An explicit `path` must exist. Without one, the per-user file
    /// (see [`default_config_path`]) is read when present and the defaults
    /// are used otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::InvalidConfig`] when the file cannot be read
    /// or parsed.
    pub fn load(path: Option<&Utf8Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match default_config_path().filter(|p| p.is_file()) {
                Some(path) => Self::from_file(&path),
                None => Ok(Self::default()),
            },
        }
    }

    /// Parse the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::InvalidConfig`] when the file cannot be read
    /// or parsed.
    pub fn from_file(path: &Utf8Path) -> Result<Self> {
        let invalid = |reason: String| ArchiveError::InvalidConfig {
            path: path.to_owned(),
            reason,
        };
        let source = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        let config = toml::from_str(&source).map_err(|e| invalid(e.to_string()))?;
        debug!("loaded packaging configuration from {path}");
        Ok(config)
    }

    /// Split [`PackagingConfig::maintainer`] into name and email.
    ///
    /// A maintainer without an `<email>` part yields an empty email.
    ///
    /// # Examples
    ///
    /// ```
    /// use rerun_archive::config::PackagingConfig;
    ///
    /// let config = PackagingConfig {
    ///     maintainer: "Ada Lovelace <ada@example.org>".to_owned(),
    ///     ..PackagingConfig::default()
    /// };
    /// assert_eq!(config.maintainer_parts(), ("Ada Lovelace", "ada@example.org"));
    /// ```
    #[must_use]
    pub fn maintainer_parts(&self) -> (&str, &str) {
        let maintainer = self.maintainer.trim();
        match maintainer.split_once('<') {
            Some((name, rest)) => (name.trim(), rest.trim_end_matches('>').trim()),
            None => (maintainer, ""),
        }
    }

    /// Homepage URL for module `name`.
    #[must_use]
    pub fn homepage(&self, name: &str) -> String {
        format!("{}/{name}", self.homepage_base.trim_end_matches('/'))
    }

    /// Install directory for module `name`.
    #[must_use]
    pub fn install_dir(&self, name: &str) -> Utf8PathBuf {
        self.install_root.join(name)
    }
}

/// Location of the per-user configuration file, if the platform defines a
/// configuration directory.
#[must_use]
pub fn default_config_path() -> Option<Utf8PathBuf> {
    let dirs = ProjectDirs::from("", "", "rerun")?;
    utf8_path(dirs.config_dir().join(CONFIG_FILE_NAME)).ok()
}
