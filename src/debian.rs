//! Debian packages, one per module.
//!
//! Each module is staged as `stb/<name>-<version>/<name>/`, packed into a
//! source tarball and unpacked again under `deb/`, where `dh_make` lays down
//! a `debian/` skeleton. The skeleton's control, changelog, copyright and
//! rules files are then rewritten for Rerun before `debuild` produces
//! `rerun-<name>_<version>-<release>_all.deb`.
//!
//! Debian tooling only exists on Debian-family hosts, so the platform is
//! checked before any module is touched.

use crate::config::PackagingConfig;
use crate::context::BuildContext;
use crate::error::{ArchiveError, Result};
use crate::executor::{Invocation, run_checked};
use crate::fsutil::{copy_tree, matching_files, relocate, require_file, set_executable};
use crate::metadata::{ResolvedModule, load_metadata};
use crate::module_name::ModuleName;
use crate::platform::OsFamily;
use crate::request::BuildRequest;
use crate::workspace::StagingWorkspace;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Datelike, Local};
use log::{debug, info, warn};
use std::fs;

/// Skeleton files `dh_make` leaves behind that the package must not ship.
const LEFTOVER_PATTERNS: [&str; 4] = ["*.ex", "*.EX", "README.Debian", "README.source"];

/// Fail unless the host can run the Debian toolchain.
///
/// # Errors
///
/// Returns [`ArchiveError::WrongPlatform`] off Debian-family hosts.
pub fn check_platform(platform: OsFamily) -> Result<()> {
    if platform == OsFamily::Debian {
        return Ok(());
    }
    Err(ArchiveError::WrongPlatform {
        format: "deb",
        required: OsFamily::Debian.label(),
        detected: platform.label().to_owned(),
    })
}

/// File name of the binary package for `module`.
///
/// # Examples
///
/// ```
/// use rerun_archive::debian::package_file_name;
/// use rerun_archive::module_name::ModuleName;
///
/// assert_eq!(
///     package_file_name(&ModuleName::from("waitfor"), "1.0.4", 2),
///     "rerun-waitfor_1.0.4-2_all.deb"
/// );
/// ```
#[must_use]
pub fn package_file_name(name: &ModuleName, version: &str, release: u32) -> String {
    format!("{}_{version}-{release}_all.deb", name.package_name())
}

/// Build one Debian package per requested module.
///
/// # Errors
///
/// Returns the first failure; modules already packaged stay in the working
/// directory.
pub fn build(ctx: &BuildContext<'_>, request: &BuildRequest) -> Result<Vec<Utf8PathBuf>> {
    check_platform(ctx.platform)?;
    if request.file.is_some() {
        warn!("--file is ignored for deb builds");
    }

    request
        .modules
        .iter()
        .map(|name| build_module(ctx, request, name))
        .collect()
}

fn build_module(
    ctx: &BuildContext<'_>,
    request: &BuildRequest,
    name: &ModuleName,
) -> Result<Utf8PathBuf> {
    let dir = ctx.registry.resolve(name)?;
    let module = load_metadata(&dir)?.validate(&dir, request.version_override())?;
    let source_name = format!("{}-{}", module.name, module.version);
    info!("building Debian package for module {} {}", module.name, module.version);

    let workspace = StagingWorkspace::create()?;
    let build_dir = workspace.create_dir("deb")?;
    let staging = workspace.create_dir(format!("stb/{source_name}/{}", module.name))?;
    copy_tree(&dir, &staging)?;

    let tarball = build_dir.join(format!("{source_name}.tar.gz"));
    run_checked(
        ctx.executor,
        &Invocation::new("tar")
            .args(["-czf", tarball.as_str()])
            .args(ctx.platform.vcs_exclude_flags())
            .args(["-C", workspace.join("stb").as_str(), source_name.as_str()]),
    )?;
    require_file(&tarball)?;
    run_checked(
        ctx.executor,
        &Invocation::new("tar").args(["-xzf", tarball.as_str(), "-C", build_dir.as_str()]),
    )?;
    let source_dir = build_dir.join(&source_name);
    if !source_dir.is_dir() {
        return Err(ArchiveError::MissingIntermediate { path: source_dir });
    }

    let (full_name, email) = ctx.config.maintainer_parts();
    run_checked(
        ctx.executor,
        &Invocation::new("dh_make")
            .args(["--indep", "--packagename"])
            .arg(format!("{}_{}", module.name.package_name(), module.version))
            .args(["--file", tarball.as_str()])
            .current_dir(&source_dir)
            .env("DEBFULLNAME", full_name)
            .env("DEBEMAIL", email)
            .stdin("\n"),
    )?;

    author_skeleton(ctx, &module, request.release, &source_dir.join("debian"))?;

    let artefact = package_file_name(&module.name, &module.version, request.release);
    run_checked(
        ctx.executor,
        &Invocation::new("debuild")
            .args(["-us", "-uc"])
            .current_dir(&source_dir),
    )
    .map_err(|err| package_failed(&module.name, &artefact, err))?;

    let package = build_dir.join(&artefact);
    require_file(&package)?;
    let mut relocated = None;
    for file in produced_files(&build_dir, &module.name)? {
        let dest = relocate(&file, &ctx.working_dir)?;
        debug!("relocated {file} to {dest}");
        if file == package {
            relocated = Some(dest);
        }
    }

    workspace.close()?;
    let package = relocated.unwrap_or_else(|| ctx.working_dir.join(&artefact));
    info!("wrote {package}");
    Ok(package)
}

fn package_failed(module: &ModuleName, artefact: &str, err: ArchiveError) -> ArchiveError {
    let code = match &err {
        ArchiveError::ToolFailed { code, .. } => *code,
        _ => None,
    };
    ArchiveError::PackageFailed {
        module: module.clone(),
        artefact: artefact.to_owned(),
        reason: err.to_string(),
        code,
    }
}

/// Rewrite the `dh_make` skeleton in `debian_dir` for `module`.
fn author_skeleton(
    ctx: &BuildContext<'_>,
    module: &ResolvedModule,
    release: u32,
    debian_dir: &Utf8Path,
) -> Result<()> {
    let control = debian_dir.join("control");
    require_file(&control)?;
    fs::write(
        &control,
        control_file(&fs::read_to_string(&control)?, module, &ctx.config),
    )?;

    fs::write(
        debian_dir.join("changelog"),
        changelog(module, release, &ctx.config, &ctx.timestamp),
    )?;

    let copyright = debian_dir.join("copyright");
    let skeleton = fs::read_to_string(&copyright).unwrap_or_default();
    fs::write(
        &copyright,
        copyright_file(&skeleton, module, &ctx.config, ctx.timestamp.year()),
    )?;

    let rules = debian_dir.join("rules");
    fs::write(&rules, rules_file(module, &ctx.config))?;
    set_executable(&rules)?;

    remove_leftovers(debian_dir)
}

fn remove_leftovers(debian_dir: &Utf8Path) -> Result<()> {
    for pattern in LEFTOVER_PATTERNS {
        for path in matching_files(debian_dir, pattern)? {
            debug!("removing skeleton file {path}");
            fs::remove_file(path)?;
        }
    }
    Ok(())
}

/// Files `debuild` left next to the source tree for this module.
fn produced_files(build_dir: &Utf8Path, name: &ModuleName) -> Result<Vec<Utf8PathBuf>> {
    let prefix = format!("{}_", name.package_name());
    let mut files = Vec::new();
    for entry in build_dir.read_dir_utf8()? {
        let entry = entry?;
        if entry.file_type()?.is_file() && entry.file_name().starts_with(&prefix) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Rewrite the skeleton `debian/control`.
///
/// The section becomes `shells`, maintainer and homepage come from the
/// configuration, the framework package is added as a dependency and the
/// description placeholder is replaced by the module's description followed
/// by a fixed long description.
#[must_use]
pub fn control_file(skeleton: &str, module: &ResolvedModule, config: &PackagingConfig) -> String {
    let mut lines = Vec::new();
    let mut in_description = false;

    for line in skeleton.lines() {
        if in_description {
            if line.starts_with([' ', '\t']) {
                continue;
            }
            in_description = false;
        }
        let rewritten = match field_name(line) {
            Some("Section") => "Section: shells".to_owned(),
            Some("Maintainer") => format!("Maintainer: {}", config.maintainer.trim()),
            Some("Homepage") => format!("Homepage: {}", config.homepage(module.name.as_str())),
            Some("Depends") => format!("Depends: ${{misc:Depends}}, {}", config.framework_package),
            Some("Description") => {
                in_description = true;
                format!("Description: {}", module.description.trim())
            }
            _ => line.to_owned(),
        };
        let is_description = in_description;
        lines.push(rewritten);
        if is_description {
            lines.extend(long_description(module, config));
        }
    }

    let mut control = lines.join("\n");
    control.push('\n');
    control
}

/// `Field` of a `Field: value` line, ignoring commented-out fields.
fn field_name(line: &str) -> Option<&str> {
    if line.starts_with(['#', ' ', '\t']) {
        return None;
    }
    line.split_once(':').map(|(field, _)| field.trim())
}

fn has_placeholder_value(line: &str) -> bool {
    line.split_once(':')
        .is_some_and(|(_, value)| value.trim_start().starts_with('<'))
}

fn long_description(module: &ResolvedModule, config: &PackagingConfig) -> [String; 3] {
    [
        format!(" Rerun module {} version {}.", module.name, module.version),
        " .".to_owned(),
        format!(
            " Installs the module's commands under {} for use with rerun.",
            config.install_dir(module.name.as_str())
        ),
    ]
}

/// A single-entry `debian/changelog`.
#[must_use]
pub fn changelog(
    module: &ResolvedModule,
    release: u32,
    config: &PackagingConfig,
    timestamp: &DateTime<Local>,
) -> String {
    format!(
        "{package} ({version}-{release}) unstable; urgency=low\n\
         \n  * Release {version}-{release} of rerun module {name}.\n\
         \n -- {maintainer}  {date}\n",
        package = module.name.package_name(),
        version = module.version,
        name = module.name,
        maintainer = config.maintainer.trim(),
        date = timestamp.to_rfc2822(),
    )
}

/// Rewrite the skeleton `debian/copyright`.
///
/// The source URL and copyright line are filled in. The second template
/// copyright line, comments, guidance lines and fields still holding a
/// `<placeholder>` are dropped.
#[must_use]
pub fn copyright_file(
    skeleton: &str,
    module: &ResolvedModule,
    config: &PackagingConfig,
    year: i32,
) -> String {
    let holder = format!(
        "{}-{year} {}",
        config.copyright_start_year,
        config.copyright_holder.trim()
    );
    let mut out = String::new();

    for line in skeleton.lines() {
        let trimmed = line.trim_start();
        if line.starts_with('#') || trimmed.starts_with('<') {
            continue;
        }
        let rewritten = match field_name(line) {
            Some("Source") => format!("Source: {}", config.homepage(module.name.as_str())),
            Some("Copyright") => format!("Copyright: {holder}"),
            Some(_) if has_placeholder_value(line) => continue,
            _ => line.to_owned(),
        };
        out.push_str(&rewritten);
        out.push('\n');
    }

    if out.trim().is_empty() {
        out = format!(
            "Format: https://www.debian.org/doc/packaging-manuals/copyright-format/1.0/\n\
             Upstream-Name: {}\n\
             Source: {}\n\n\
             Files: *\n\
             Copyright: {holder}\n",
            module.name.package_name(),
            config.homepage(module.name.as_str()),
        );
    }
    out
}

/// `debian/rules` installing the module tree into the framework's module
/// directory.
#[must_use]
pub fn rules_file(module: &ResolvedModule, config: &PackagingConfig) -> String {
    let dest = format!(
        "debian/{}{}",
        module.name.package_name(),
        config.install_dir(module.name.as_str())
    );
    format!(
        "#!/usr/bin/make -f\n\
         \n%:\n\tdh $@\n\
         \noverride_dh_auto_install:\n\
         \tmkdir -p {dest}\n\
         \tcp -pR {name}/. {dest}/\n",
        name = module.name,
    )
}

#[cfg(test)]
#[path = "debian_tests.rs"]
mod tests;
