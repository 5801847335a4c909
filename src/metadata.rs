//! Module metadata loading and validation.
//!
//! A module's `metadata` file is a list of shell-style `KEY=VALUE`
//! assignments. Each load returns a freshly built [`ModuleMetadata`], so
//! fields from one module can never leak into the next module processed in
//! the same run.

use crate::error::{ArchiveError, Result};
use crate::module_name::ModuleName;
use crate::registry::metadata_path;
use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;

/// Fields read from a module's `metadata` file, as declared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleMetadata {
    /// `NAME`
    pub name: String,
    /// `DESCRIPTION`
    pub description: String,
    /// `VERSION`
    pub version: String,
    /// `REQUIRES`: names of other modules this one depends on.
    pub requires: Vec<String>,
    /// `EXTERNALS`: opaque dependency strings passed through verbatim.
    pub externals: Vec<String>,
}

/// A module whose metadata passed validation, ready for packaging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModule {
    /// Validated module name.
    pub name: ModuleName,
    /// Human-readable description.
    pub description: String,
    /// Effective version: the build override if one was given, else the
    /// module's own.
    pub version: String,
    /// Module dependencies.
    pub requires: Vec<String>,
    /// External dependencies.
    pub externals: Vec<String>,
    /// The module directory.
    pub dir: Utf8PathBuf,
}

/// Parse the contents of a metadata file.
///
/// Blank lines, `#` comments and lines without `=` are ignored; an
/// `export ` prefix, one layer of quotes and a trailing ` # comment` are
/// stripped. Unknown keys are ignored.
///
/// # Examples
///
/// ```
/// use rerun_archive::metadata::parse_metadata;
///
/// let metadata = parse_metadata("NAME=waitfor\nDESCRIPTION=\"wait for things\"\nVERSION=1.0.4\n");
/// assert_eq!(metadata.name, "waitfor");
/// assert_eq!(metadata.description, "wait for things");
/// assert_eq!(metadata.version, "1.0.4");
/// ```
#[must_use]
pub fn parse_metadata(contents: &str) -> ModuleMetadata {
    let mut metadata = ModuleMetadata::default();

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let assignment = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, raw)) = assignment.split_once('=') else {
            continue;
        };
        let value = shell_value(raw);

        match key.trim() {
            "NAME" => metadata.name = value.to_owned(),
            "DESCRIPTION" => metadata.description = value.to_owned(),
            "VERSION" => metadata.version = value.to_owned(),
            "REQUIRES" => metadata.requires = split_list(value, &[' ', '\t', ',']),
            "EXTERNALS" => metadata.externals = split_list(value, &[',']),
            _ => {}
        }
    }

    metadata
}

/// The value of an assignment: the contents of a leading quoted string, or
/// the unquoted text up to a ` #` comment.
fn shell_value(raw: &str) -> &str {
    let raw = raw.trim();
    let quoted = ['"', '\''].iter().find_map(|&q| {
        let rest = raw.strip_prefix(q)?;
        rest.find(q).map(|end| &rest[..end])
    });
    quoted.unwrap_or_else(|| strip_comment(raw))
}

fn strip_comment(value: &str) -> &str {
    let comment = value
        .char_indices()
        .zip(value.chars().skip(1))
        .find(|&((_, c), next)| c.is_whitespace() && next == '#')
        .map(|((i, _), _)| i);
    comment.map_or(value, |i| value[..i].trim_end())
}

fn split_list(value: &str, separators: &[char]) -> Vec<String> {
    value
        .split(separators)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Read and parse `<module_dir>/metadata`.
///
/// # Errors
///
/// Returns [`ArchiveError::MetadataUnreadable`] when the file is missing or
/// cannot be read.
pub fn load_metadata(module_dir: &Utf8Path) -> Result<ModuleMetadata> {
    let path = metadata_path(module_dir);
    let contents = std::fs::read_to_string(&path)
        .map_err(|source| ArchiveError::MetadataUnreadable { path, source })?;
    Ok(parse_metadata(&contents))
}

impl ModuleMetadata {
    /// Check the required fields and settle the effective version.
    ///
    /// A non-blank `version_override` replaces the declared version.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::MissingField`] for a blank `NAME`,
    /// `DESCRIPTION` or effective `VERSION`, and
    /// [`ArchiveError::ReservedName`] when the name is reserved.
    pub fn validate(
        self,
        module_dir: &Utf8Path,
        version_override: Option<&str>,
    ) -> Result<ResolvedModule> {
        let missing = |field| ArchiveError::MissingField {
            path: module_dir.to_owned(),
            field,
        };

        let name = ModuleName::from(self.name.trim());
        if name.as_str().is_empty() {
            return Err(missing("NAME"));
        }
        if name.is_reserved() {
            return Err(ArchiveError::ReservedName {
                path: module_dir.to_owned(),
                name: name.into_inner(),
            });
        }
        if self.description.trim().is_empty() {
            return Err(missing("DESCRIPTION"));
        }

        let version = version_override
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| self.version.trim());
        if version.is_empty() {
            return Err(missing("VERSION"));
        }
        let version = version.to_owned();

        Ok(ResolvedModule {
            name,
            description: self.description,
            version,
            requires: self.requires,
            externals: self.externals,
            dir: module_dir.to_owned(),
        })
    }
}

/// A `major.minor.revision` version triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleVersion {
    /// Major version; must match the host framework's for RPM builds.
    pub major: u32,
    /// Minor version.
    pub minor: u32,
    /// Revision.
    pub revision: u32,
}

impl ModuleVersion {
    /// Split `version` into its three numeric components.
    ///
    /// Components beyond the third are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::InvalidVersion`] naming the first component
    /// that is absent or not a number.
    ///
    /// # Examples
    ///
    /// ```
    /// use rerun_archive::metadata::ModuleVersion;
    ///
    /// let version = ModuleVersion::parse("1.2.0")?;
    /// assert_eq!((version.major, version.minor, version.revision), (1, 2, 0));
    /// assert!(ModuleVersion::parse("1.2").is_err());
    /// # Ok::<(), rerun_archive::error::ArchiveError>(())
    /// ```
    pub fn parse(version: &str) -> Result<Self> {
        let mut parts = version.trim().split('.');
        let mut component = |label: &'static str| {
            parts
                .next()
                .and_then(|p| p.trim().parse::<u32>().ok())
                .ok_or_else(|| ArchiveError::InvalidVersion {
                    version: version.to_owned(),
                    component: label,
                })
        };

        let major = component("major")?;
        let minor = component("minor")?;
        let revision = component("revision")?;
        Ok(Self {
            major,
            minor,
            revision,
        })
    }

    /// Extract only the major number, tolerating a short version string.
    ///
    /// The host framework's version is only ever compared on its major
    /// component.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::InvalidVersion`] if the first component is not
    /// a number.
    pub fn parse_major(version: &str) -> Result<u32> {
        version
            .trim()
            .split('.')
            .next()
            .and_then(|p| p.trim().parse::<u32>().ok())
            .ok_or_else(|| ArchiveError::InvalidVersion {
                version: version.to_owned(),
                component: "major",
            })
    }
}

impl fmt::Display for ModuleVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.revision)
    }
}

/// Build the combined RPM dependency string for a module.
///
/// Each module dependency is pinned to `major` as `rerun-<dep> = <major>`;
/// externals follow verbatim. Entries are joined with `", "`.
///
/// # Examples
///
/// ```
/// use rerun_archive::metadata::requires_clause;
///
/// let requires = vec!["stubbs".to_owned()];
/// let externals = vec!["curl >= 7".to_owned()];
/// assert_eq!(
///     requires_clause(&requires, &externals, 1),
///     "rerun-stubbs = 1, curl >= 7"
/// );
/// ```
#[must_use]
pub fn requires_clause(requires: &[String], externals: &[String], major: u32) -> String {
    requires
        .iter()
        .map(|dep| format!("rerun-{dep} = {major}"))
        .chain(externals.iter().cloned())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
#[path = "metadata_tests.rs"]
mod tests;
