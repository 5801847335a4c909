//! Module lookup.
//!
//! The registry answers one question: where on disk does the module with a
//! given name live? Structural checks (a `commands/` directory, a readable
//! `metadata` file) are left to each builder because the formats tolerate
//! missing pieces differently.

use crate::error::{ArchiveError, Result};
use crate::module_name::ModuleName;
use camino::{Utf8Path, Utf8PathBuf};

/// Name of the directory that marks a directory as a Rerun module.
pub const COMMANDS_DIR: &str = "commands";

/// Name of the metadata declaration file inside a module directory.
pub const METADATA_FILE: &str = "metadata";

/// Resolves module names to module directories.
#[cfg_attr(test, mockall::automock)]
pub trait ModuleRegistry {
    /// Return the directory of the module called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::ModuleNotFound`] when no such module exists.
    fn resolve(&self, name: &ModuleName) -> Result<Utf8PathBuf>;
}

/// Looks modules up in an ordered list of module directories.
///
/// # Examples
///
/// ```
/// use camino::Utf8PathBuf;
/// use rerun_archive::registry::DirectoryRegistry;
///
/// let registry = DirectoryRegistry::new(vec![Utf8PathBuf::from("/usr/lib/rerun/modules")]);
/// assert_eq!(registry.search_path().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DirectoryRegistry {
    search_path: Vec<Utf8PathBuf>,
}

impl DirectoryRegistry {
    /// Create a registry searching `search_path` in order.
    #[must_use]
    pub fn new(search_path: Vec<Utf8PathBuf>) -> Self {
        Self { search_path }
    }

    /// Build a registry from a colon-separated module path such as the value
    /// of `RERUN_MODULES`. Empty and non-UTF-8 entries are ignored.
    #[must_use]
    pub fn from_path_list(list: &str) -> Self {
        let search_path = std::env::split_paths(list)
            .filter(|p| !p.as_os_str().is_empty())
            .filter_map(|p| Utf8PathBuf::try_from(p).ok())
            .collect();
        Self { search_path }
    }

    /// The directories searched, in order.
    #[must_use]
    pub fn search_path(&self) -> &[Utf8PathBuf] {
        &self.search_path
    }
}

impl ModuleRegistry for DirectoryRegistry {
    fn resolve(&self, name: &ModuleName) -> Result<Utf8PathBuf> {
        self.search_path
            .iter()
            .map(|dir| dir.join(name.as_str()))
            .find(|candidate| candidate.is_dir())
            .ok_or_else(|| ArchiveError::ModuleNotFound { name: name.clone() })
    }
}

/// Returns true if `module_dir` contains a `commands/` directory.
#[must_use]
pub fn has_commands_dir(module_dir: &Utf8Path) -> bool {
    module_dir.join(COMMANDS_DIR).is_dir()
}

/// Path of the metadata file inside `module_dir`.
#[must_use]
pub fn metadata_path(module_dir: &Utf8Path) -> Utf8PathBuf {
    module_dir.join(METADATA_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use std::fs;
    use tempfile::TempDir;

    #[fixture]
    fn module_tree() -> (TempDir, Utf8PathBuf, Utf8PathBuf) {
        let temp = TempDir::new().expect("temp dir creation succeeds");
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("utf8 temp path");
        let first = root.join("first");
        let second = root.join("second");
        fs::create_dir_all(first.join("alpha/commands")).expect("mkdir alpha");
        fs::create_dir_all(second.join("alpha")).expect("mkdir shadowed alpha");
        fs::create_dir_all(second.join("beta")).expect("mkdir beta");
        (temp, first, second)
    }

    #[rstest]
    fn resolve_prefers_earlier_search_path_entries(
        module_tree: (TempDir, Utf8PathBuf, Utf8PathBuf),
    ) {
        let (_temp, first, second) = module_tree;
        let registry = DirectoryRegistry::new(vec![first.clone(), second.clone()]);

        let alpha = registry.resolve(&ModuleName::from("alpha")).expect("alpha");
        assert_eq!(alpha, first.join("alpha"));
        assert!(has_commands_dir(&alpha));

        let beta = registry.resolve(&ModuleName::from("beta")).expect("beta");
        assert_eq!(beta, second.join("beta"));
        assert!(!has_commands_dir(&beta));
    }

    #[rstest]
    fn resolve_reports_unknown_modules(module_tree: (TempDir, Utf8PathBuf, Utf8PathBuf)) {
        let (_temp, first, _second) = module_tree;
        let registry = DirectoryRegistry::new(vec![first]);

        let err = registry
            .resolve(&ModuleName::from("gamma"))
            .expect_err("gamma is absent");
        assert!(matches!(err, ArchiveError::ModuleNotFound { name } if name.as_str() == "gamma"));
    }

    #[cfg(unix)]
    #[test]
    fn from_path_list_skips_empty_entries() {
        let registry = DirectoryRegistry::from_path_list("/opt/modules::/usr/lib/rerun/modules");
        assert_eq!(
            registry.search_path(),
            &[
                Utf8PathBuf::from("/opt/modules"),
                Utf8PathBuf::from("/usr/lib/rerun/modules")
            ]
        );
    }

    #[test]
    fn metadata_path_joins_file_name() {
        assert_eq!(
            metadata_path(Utf8Path::new("/m/foo")),
            Utf8PathBuf::from("/m/foo/metadata")
        );
    }
}
