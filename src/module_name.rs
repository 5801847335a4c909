//! Semantic wrapper for Rerun module names.
//!
//! This module provides the [`ModuleName`] newtype for type-safe handling of
//! module names throughout the builders.

use std::fmt;

/// Module name the Debian tooling reserves for its own control directory.
pub const RESERVED_MODULE_NAME: &str = "debian";

/// The name of a Rerun module, as requested on the command line or declared
/// in its metadata.
///
/// Validation is performed where the name is used (see
/// [`crate::metadata::ModuleMetadata::validate`]), not by this type itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleName(String);

impl ModuleName {
    /// Create a new module name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the module name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper and return the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Returns true when the name collides with [`RESERVED_MODULE_NAME`].
    #[must_use]
    pub fn is_reserved(&self) -> bool {
        self.0 == RESERVED_MODULE_NAME
    }

    /// The package name used for Debian and RPM artefacts: `rerun-<name>`.
    #[must_use]
    pub fn package_name(&self) -> String {
        format!("rerun-{}", self.0)
    }
}

impl AsRef<str> for ModuleName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ModuleName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for ModuleName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
