//! Collaborators shared by every builder.

use crate::config::PackagingConfig;
use crate::encoder::Encoding;
use crate::executor::CommandExecutor;
use crate::host::HostFramework;
use crate::platform::OsFamily;
use crate::registry::ModuleRegistry;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Local};

/// User name recorded when the environment does not name one.
const UNKNOWN_USER: &str = "unknown";

/// Everything a builder needs besides the request itself.
///
/// Tests build a context around a [`crate::test_utils::StubExecutor`] and a
/// mocked registry; the binary wires in the real collaborators.
pub struct BuildContext<'a> {
    /// Runs external tools.
    pub executor: &'a dyn CommandExecutor,
    /// Resolves module names to directories.
    pub registry: &'a dyn ModuleRegistry,
    /// The invoking framework.
    pub host: HostFramework,
    /// Host operating-system family.
    pub platform: OsFamily,
    /// Payload encoding, or `None` when no encoder is installed.
    pub encoding: Option<Encoding>,
    /// Package metadata defaults.
    pub config: PackagingConfig,
    /// Directory artefacts are written to.
    pub working_dir: Utf8PathBuf,
    /// Template directory used when the request names none.
    pub template_dir: Utf8PathBuf,
    /// Build timestamp stamped into scripts and changelogs.
    pub timestamp: DateTime<Local>,
    /// The invoking user.
    pub user: String,
}

impl<'a> BuildContext<'a> {
    /// Create a context with host-derived defaults.
    ///
    /// The platform and encoding are detected, the configuration is the
    /// default one, the timestamp is now and the user comes from `USER` or
    /// `LOGNAME`.
    #[must_use]
    pub fn new(
        executor: &'a dyn CommandExecutor,
        registry: &'a dyn ModuleRegistry,
        working_dir: Utf8PathBuf,
        template_dir: Utf8PathBuf,
    ) -> Self {
        Self {
            executor,
            registry,
            host: HostFramework::default(),
            platform: OsFamily::detect(),
            encoding: Encoding::detect().ok(),
            config: PackagingConfig::default(),
            working_dir,
            template_dir,
            timestamp: Local::now(),
            user: current_user(),
        }
    }

    /// Replace the host framework description.
    #[must_use]
    pub fn with_host(mut self, host: HostFramework) -> Self {
        self.host = host;
        self
    }

    /// Replace the detected platform.
    #[must_use]
    pub fn with_platform(mut self, platform: OsFamily) -> Self {
        self.platform = platform;
        self
    }

    /// Replace the detected encoding.
    #[must_use]
    pub fn with_encoding(mut self, encoding: Option<Encoding>) -> Self {
        self.encoding = encoding;
        self
    }

    /// Replace the packaging configuration.
    #[must_use]
    pub fn with_config(mut self, config: PackagingConfig) -> Self {
        self.config = config;
        self
    }

    /// Pin the build timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Local>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Replace the invoking user.
    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// The template directory for a request, honouring its override.
    #[must_use]
    pub fn template_dir_for<'r>(&'r self, requested: Option<&'r Utf8Path>) -> &'r Utf8Path {
        requested.unwrap_or(&self.template_dir)
    }
}

fn current_user() -> String {
    ["USER", "LOGNAME"]
        .iter()
        .find_map(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
        .unwrap_or_else(|| UNKNOWN_USER.to_owned())
}
