//! Error types for the archive builders.
//!
//! Every failure is detected at the point it occurs and propagated unchanged
//! through the builder and dispatcher. Each variant carries enough context to
//! name the offending module, path, or tool, and maps onto one of four
//! [`ErrorKind`] tags that drive the process exit status.

use crate::module_name::ModuleName;
use camino::Utf8PathBuf;
use std::fmt;
use thiserror::Error;

/// Broad classification of an [`ArchiveError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad input: unknown format, missing version, reserved or missing fields.
    Validation,
    /// A module or one of its required files could not be found.
    NotFound,
    /// An external packaging tool failed or left no output behind.
    Toolchain,
    /// The host environment cannot perform the requested build.
    Environment,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Validation => "validation error",
            Self::NotFound => "not found",
            Self::Toolchain => "toolchain error",
            Self::Environment => "environment error",
        };
        f.write_str(label)
    }
}

/// Errors that can occur while building an archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The requested format is not one of `bin`, `sh`, `deb` or `rpm`.
    #[error("unsupported archive format \"{format}\"; expected one of: bin, sh, deb, rpm")]
    UnsupportedFormat {
        /// The rejected format string.
        format: String,
    },

    /// No version was supplied and none could be inherited from a module.
    #[error("missing required option: --version")]
    MissingVersion,

    /// No module names were given.
    #[error("no modules specified; use --modules")]
    NoModules,

    /// A module declares a name the packaging tools reserve for themselves.
    #[error("module at {path} uses the reserved name \"{name}\"")]
    ReservedName {
        /// Path to the module directory.
        path: Utf8PathBuf,
        /// The reserved name.
        name: String,
    },

    /// A required metadata field is absent or blank.
    #[error("module at {path} is missing required metadata field {field}")]
    MissingField {
        /// Path to the module directory.
        path: Utf8PathBuf,
        /// The metadata key that was expected.
        field: &'static str,
    },

    /// A version string lacks one of its `major.minor.revision` components.
    #[error("version \"{version}\" has no valid {component} number")]
    InvalidVersion {
        /// The version string as declared.
        version: String,
        /// The missing or malformed component.
        component: &'static str,
    },

    /// The module's major version differs from the host framework's.
    #[error(
        "module {module} major version {module_major} does not match rerun major version {host_major}"
    )]
    IncompatibleVersion {
        /// The module being packaged.
        module: ModuleName,
        /// Major version declared by the module.
        module_major: u32,
        /// Major version of the host framework.
        host_major: u32,
    },

    /// The release number is not a positive integer.
    #[error("release \"{release}\" must be a positive integer")]
    InvalidRelease {
        /// The rejected release value.
        release: String,
    },

    /// The module registry has no module with this name.
    #[error("module {name} not found")]
    ModuleNotFound {
        /// The requested module name.
        name: ModuleName,
    },

    /// The module's metadata file is missing or unreadable.
    #[error("module metadata {path} is missing or unreadable: {source}")]
    MetadataUnreadable {
        /// Path to the metadata file.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A template file could not be read.
    #[error("template {path} not found")]
    TemplateNotFound {
        /// Path to the missing template.
        path: Utf8PathBuf,
    },

    /// The directory that should contain the output file does not exist.
    #[error("output directory {path} does not exist")]
    OutputDirectoryMissing {
        /// The missing directory.
        path: Utf8PathBuf,
    },

    /// An external tool exited unsuccessfully.
    #[error(
        "{program} failed{}: {message}",
        .code.map_or_else(String::new, |c| format!(" with exit status {c}"))
    )]
    ToolFailed {
        /// The program that was run.
        program: String,
        /// The exit status, when the tool was not killed by a signal.
        code: Option<i32>,
        /// The tool's trimmed stderr output.
        message: String,
    },

    /// An external tool could not be started.
    #[error("failed to run {program}: {source}")]
    ToolSpawn {
        /// The program that was run.
        program: String,
        /// The underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// A packaging step for a module failed to produce its artefact.
    #[error("failed to build {artefact} for module {module}: {reason}")]
    PackageFailed {
        /// The module being packaged.
        module: ModuleName,
        /// The artefact file name that was expected.
        artefact: String,
        /// Description of the failure.
        reason: String,
        /// Exit status of the failing tool, when known.
        code: Option<i32>,
    },

    /// A step finished but the file it should have produced is absent.
    #[error("expected intermediate file {path} was not created")]
    MissingIntermediate {
        /// The missing file.
        path: Utf8PathBuf,
    },

    /// Neither `openssl` nor `uuencode` is available.
    #[error("no payload encoder available; install openssl or uuencode (sharutils)")]
    NoEncoder,

    /// The host framework executable could not be located.
    #[error("rerun executable not found: {reason}")]
    HostExecutableNotFound {
        /// Description of where it was looked for.
        reason: String,
    },

    /// The host framework version is unknown.
    #[error("rerun version unknown; set RERUN_VERSION or pass --rerun-version")]
    HostVersionUnknown,

    /// The build requires a different operating system family.
    #[error("{format} packages can only be built on {required} systems (detected {detected})")]
    WrongPlatform {
        /// The requested format.
        format: &'static str,
        /// The family the format requires.
        required: &'static str,
        /// The detected family.
        detected: String,
    },

    /// A path is not valid UTF-8.
    #[error("path is not valid UTF-8: {path}")]
    NonUtf8Path {
        /// Lossy rendering of the offending path.
        path: String,
    },

    /// The packaging configuration file could not be parsed.
    #[error("invalid configuration file {path}: {reason}")]
    InvalidConfig {
        /// Path to the configuration file.
        path: Utf8PathBuf,
        /// Description of the parse error.
        reason: String,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Test stub received an unexpected or mismatched command invocation.
    #[cfg(any(test, feature = "test-support"))]
    #[error("stub mismatch: {message}")]
    StubMismatch {
        /// Description of what was expected versus what was received.
        message: String,
    },
}

impl ArchiveError {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedFormat { .. }
            | Self::MissingVersion
            | Self::NoModules
            | Self::ReservedName { .. }
            | Self::MissingField { .. }
            | Self::InvalidVersion { .. }
            | Self::IncompatibleVersion { .. }
            | Self::InvalidRelease { .. }
            | Self::OutputDirectoryMissing { .. }
            | Self::InvalidConfig { .. } => ErrorKind::Validation,
            Self::ModuleNotFound { .. }
            | Self::MetadataUnreadable { .. }
            | Self::TemplateNotFound { .. } => ErrorKind::NotFound,
            Self::ToolFailed { .. }
            | Self::ToolSpawn { .. }
            | Self::PackageFailed { .. }
            | Self::MissingIntermediate { .. } => ErrorKind::Toolchain,
            Self::NoEncoder
            | Self::HostExecutableNotFound { .. }
            | Self::HostVersionUnknown
            | Self::WrongPlatform { .. }
            | Self::NonUtf8Path { .. }
            | Self::Io(_) => ErrorKind::Environment,
            #[cfg(any(test, feature = "test-support"))]
            Self::StubMismatch { .. } => ErrorKind::Toolchain,
        }
    }

    /// Process exit status for this error.
    ///
    /// Toolchain failures propagate the failing tool's own exit status when
    /// it is known and non-zero.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ToolFailed { code: Some(c), .. } | Self::PackageFailed { code: Some(c), .. }
                if *c != 0 =>
            {
                *c
            }
            _ => match self.kind() {
                ErrorKind::Validation => 2,
                ErrorKind::NotFound => 3,
                ErrorKind::Toolchain | ErrorKind::Environment => 1,
            },
        }
    }
}

/// Result type alias using [`ArchiveError`].
pub type Result<T> = std::result::Result<T, ArchiveError>;
