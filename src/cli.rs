//! CLI argument definitions for the archive builder.
//!
//! The format is kept as a plain string so an unknown value surfaces as the
//! builder's own validation error rather than a clap usage error.

use crate::error::Result;
use crate::host::HostFramework;
use crate::module_name::ModuleName;
use crate::registry::DirectoryRegistry;
use crate::request::{BuildRequest, DEFAULT_RELEASE};
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use log::LevelFilter;

/// Directory name of the shipped templates.
pub const TEMPLATES_DIR: &str = "templates";

/// Install-relative template location, resolved against the executable's
/// directory.
pub const SHARED_TEMPLATES_DIR: &str = "../share/rerun-archive/templates";

/// Build a Rerun module archive.
#[derive(Parser, Debug, Clone)]
#[command(name = "rerun-archive")]
#[command(about)]
#[command(long_about = concat!(
    "Build a Rerun module archive.\n\n",
    "Packages one or more modules as a self-extracting shell archive (bin/sh), ",
    "one Debian package per module (deb) or one RPM per module (rpm). ",
    "Artefacts are written to the current directory.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Bundle two modules into a runnable script:\n",
    "    $ rerun-archive -f bin -m stubbs,waitfor --version 2.0.0 --file tools.sh\n\n",
    "  Build an RPM for each module:\n",
    "    $ rerun-archive -f rpm -m stubbs -m waitfor --release 3\n",
))]
pub struct Cli {
    /// Archive format: bin, sh, deb or rpm.
    #[arg(short, long, value_name = "FORMAT")]
    pub format: String,

    /// Output path for shell archives [default: rerun.sh].
    #[arg(long, value_name = "PATH")]
    pub file: Option<Utf8PathBuf>,

    /// Modules to package (repeatable, or comma/space separated).
    #[arg(short, long, value_name = "NAME", num_args = 1..)]
    pub modules: Vec<String>,

    /// Version override applied to every module.
    #[arg(long, value_name = "VERSION")]
    pub version: Option<String>,

    /// Package release number.
    #[arg(long, value_name = "N", default_value_t = DEFAULT_RELEASE)]
    pub release: u32,

    /// Directory holding the extract, launcher and rerun.spec templates.
    #[arg(long, value_name = "DIR")]
    pub template: Option<Utf8PathBuf>,

    /// Colon-separated module search path.
    #[arg(long, value_name = "DIR", env = "RERUN_MODULES", default_value = "")]
    pub modules_dir: String,

    /// Path to the rerun executable [default: rerun on PATH].
    #[arg(long, value_name = "PATH", env = "RERUN")]
    pub rerun: Option<Utf8PathBuf>,

    /// Version of the rerun framework being packaged against.
    #[arg(long, value_name = "VERSION", env = "RERUN_VERSION")]
    pub rerun_version: Option<String>,

    /// Packaging configuration file.
    #[arg(long, value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,

    /// Increase log verbosity (repeatable: -v, -vv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Only report errors.
    #[arg(short, long, conflicts_with = "verbosity")]
    pub quiet: bool,
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            format: String::new(),
            file: None,
            modules: Vec::new(),
            version: None,
            release: DEFAULT_RELEASE,
            template: None,
            modules_dir: String::new(),
            rerun: None,
            rerun_version: None,
            config: None,
            verbosity: 0,
            quiet: false,
        }
    }
}

impl Cli {
    /// Module names in the order given, with comma and whitespace separated
    /// lists expanded.
    ///
    /// # Examples
    ///
    /// ```
    /// use rerun_archive::cli::Cli;
    /// use rerun_archive::module_name::ModuleName;
    ///
    /// let cli = Cli {
    ///     modules: vec!["stubbs,waitfor".to_owned(), "foo bar".to_owned()],
    ///     ..Cli::default()
    /// };
    /// let names: Vec<String> = cli.module_names().iter().map(ToString::to_string).collect();
    /// assert_eq!(names, ["stubbs", "waitfor", "foo", "bar"]);
    /// ```
    #[must_use]
    pub fn module_names(&self) -> Vec<ModuleName> {
        self.modules
            .iter()
            .flat_map(|entry| entry.split(|c: char| c == ',' || c.is_whitespace()))
            .filter(|name| !name.is_empty())
            .map(ModuleName::from)
            .collect()
    }

    /// Turn the arguments into a build request.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::ArchiveError::UnsupportedFormat`] for an
    /// unknown format.
    pub fn build_request(&self) -> Result<BuildRequest> {
        let mut request =
            BuildRequest::new(&self.format, self.module_names())?.with_release(self.release);
        if let Some(file) = &self.file {
            request = request.with_file(file.clone());
        }
        if let Some(version) = &self.version {
            request = request.with_version(version.clone());
        }
        if let Some(template) = &self.template {
            request = request.with_template(template.clone());
        }
        Ok(request)
    }

    /// The module registry described by `--modules-dir`.
    #[must_use]
    pub fn registry(&self) -> DirectoryRegistry {
        DirectoryRegistry::from_path_list(&self.modules_dir)
    }

    /// The host framework, falling back to `rerun` on `PATH`.
    #[must_use]
    pub fn host(&self) -> HostFramework {
        HostFramework::locate(self.rerun_version.clone(), self.rerun.clone())
    }

    /// Log level implied by `-v` and `-q`.
    #[must_use]
    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Error;
        }
        match self.verbosity {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

/// The template directory used when the request names none.
///
/// Looks for `templates/` next to the executable, then the install-relative
/// share directory, and finally the templates shipped with the source tree.
#[must_use]
pub fn default_template_dir(exe_dir: Option<&Utf8Path>) -> Utf8PathBuf {
    exe_dir
        .into_iter()
        .flat_map(|dir| [dir.join(TEMPLATES_DIR), dir.join(SHARED_TEMPLATES_DIR)])
        .find(|candidate| candidate.is_dir())
        .unwrap_or_else(|| Utf8Path::new(env!("CARGO_MANIFEST_DIR")).join(TEMPLATES_DIR))
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
