//! RPM packages, one per module.
//!
//! Modules are packed into `SOURCES/<name>-<version>.tgz` inside an
//! `rpmbuild` top directory and built against the shared `rerun.spec`
//! template, with every module-specific value passed as a `--define`.
//! A module must share its major version with the framework it is packaged
//! for; the check runs before `rpmbuild` is ever invoked.

use crate::context::BuildContext;
use crate::error::{ArchiveError, Result};
use crate::executor::{Invocation, run_checked};
use crate::fsutil::{
    copy_tree, is_writable, make_writable, matching_files, relocate, require_file,
};
use crate::metadata::{ModuleVersion, ResolvedModule, load_metadata, requires_clause};
use crate::module_name::ModuleName;
use crate::registry::metadata_path;
use crate::request::BuildRequest;
use crate::workspace::StagingWorkspace;
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info, warn};
use std::fs;

/// Spec template shared by all module packages.
pub const SPEC_TEMPLATE: &str = "rerun.spec";

/// Subdirectories of an `rpmbuild` top directory the build needs.
const TOPDIR_LAYOUT: [&str; 4] = ["SOURCES", "BUILD", "RPMS", "tmp"];

/// File name of the binary package for `name`.
///
/// # Examples
///
/// ```
/// use rerun_archive::module_name::ModuleName;
/// use rerun_archive::rpm::package_file_name;
///
/// assert_eq!(
///     package_file_name(&ModuleName::from("waitfor"), "1.0.4", 1, ".el9"),
///     "rerun-waitfor-1.0.4-1.el9.noarch.rpm"
/// );
/// ```
#[must_use]
pub fn package_file_name(name: &ModuleName, version: &str, release: u32, dist: &str) -> String {
    format!("{}-{version}-{release}{dist}.noarch.rpm", name.package_name())
}

/// Build one RPM per requested module.
///
/// Modules without a metadata file are skipped with a warning.
///
/// # Errors
///
/// Returns the first failure; modules already packaged stay in the working
/// directory.
pub fn build(ctx: &BuildContext<'_>, request: &BuildRequest) -> Result<Vec<Utf8PathBuf>> {
    if request.file.is_some() {
        warn!("--file is ignored for rpm builds");
    }

    let mut packages = Vec::new();
    for name in &request.modules {
        if let Some(package) = build_module(ctx, request, name)? {
            packages.push(package);
        }
    }
    Ok(packages)
}

/// Fail unless `module` shares the framework's major version.
///
/// # Errors
///
/// Returns [`ArchiveError::InvalidVersion`] for a malformed version and
/// [`ArchiveError::IncompatibleVersion`] on a mismatch.
pub fn check_compatible(module: &ResolvedModule, host_major: u32) -> Result<ModuleVersion> {
    let version = ModuleVersion::parse(&module.version)?;
    if version.major != host_major {
        return Err(ArchiveError::IncompatibleVersion {
            module: module.name.clone(),
            module_major: version.major,
            host_major,
        });
    }
    Ok(version)
}

/// Delete `rerun-<name>-*.rpm` files left in `dir` by earlier builds.
///
/// # Errors
///
/// Returns [`ArchiveError::Io`] if the directory cannot be listed or a
/// matching file cannot be removed.
pub fn remove_stale_packages(dir: &Utf8Path, name: &ModuleName) -> Result<()> {
    let pattern = format!("{}-*.rpm", glob::Pattern::escape(&name.package_name()));
    for path in matching_files(dir, &pattern)? {
        debug!("removing stale package {path}");
        fs::remove_file(path)?;
    }
    Ok(())
}

fn build_module(
    ctx: &BuildContext<'_>,
    request: &BuildRequest,
    name: &ModuleName,
) -> Result<Option<Utf8PathBuf>> {
    let dir = ctx.registry.resolve(name)?;
    if !metadata_path(&dir).is_file() {
        warn!("skipping module {name}: {dir} has no metadata file");
        return Ok(None);
    }
    let module = load_metadata(&dir)?.validate(&dir, request.version_override())?;
    let version = check_compatible(&module, ctx.host.major()?)?;

    let spec = ctx
        .template_dir_for(request.template.as_deref())
        .join(SPEC_TEMPLATE);
    if !spec.is_file() {
        return Err(ArchiveError::TemplateNotFound { path: spec });
    }

    let dist = ctx.platform.dist_tag(ctx.executor)?;
    remove_stale_packages(&dir, &module.name)?;
    info!("building RPM for module {} {}", module.name, module.version);

    let workspace = StagingWorkspace::create()?;
    for sub in TOPDIR_LAYOUT {
        workspace.create_dir(sub)?;
    }
    let sources = workspace.join("SOURCES");
    let tarball = pack_sources(ctx, &module, &sources)?;
    debug!("packed {tarball}");

    let artefact = package_file_name(&module.name, &module.version, request.release, &dist);
    let invocation = rpmbuild_invocation(
        workspace.path(),
        &module,
        version,
        request.release,
        &dist,
        &spec,
    );
    run_checked(ctx.executor, &invocation).map_err(|err| ArchiveError::PackageFailed {
        module: module.name.clone(),
        artefact: artefact.clone(),
        code: match &err {
            ArchiveError::ToolFailed { code, .. } => *code,
            _ => None,
        },
        reason: err.to_string(),
    })?;

    let produced = workspace.join("RPMS/noarch").join(&artefact);
    require_file(&produced)?;
    let package = relocate(&produced, &ctx.working_dir)?;

    workspace.close()?;
    info!("wrote {package}");
    Ok(Some(package))
}

/// Copy the module to `SOURCES/<name>-<version>/`, pack it into
/// `SOURCES/<name>-<version>.tgz` and drop the copy.
fn pack_sources(
    ctx: &BuildContext<'_>,
    module: &ResolvedModule,
    sources: &Utf8Path,
) -> Result<Utf8PathBuf> {
    let source_name = format!("{}-{}", module.name, module.version);
    let staging = sources.join(&source_name);
    copy_tree(&module.dir, &staging)?;
    if !is_writable(&staging) {
        warn!("{staging} is not writable; adding write permission");
        make_writable(staging.as_std_path())?;
    }

    let tarball = sources.join(format!("{source_name}.tgz"));
    run_checked(
        ctx.executor,
        &Invocation::new("tar")
            .args(["-czf", tarball.as_str()])
            .args(ctx.platform.vcs_exclude_flags())
            .args(["-C", sources.as_str(), source_name.as_str()]),
    )?;
    require_file(&tarball)?;

    make_writable(staging.as_std_path())?;
    fs::remove_dir_all(&staging)?;
    Ok(tarball)
}

/// The `rpmbuild` call for `module`.
///
/// `requires` is only defined when the module has dependencies and `dist`
/// only when the tag is non-empty, so the conditional macros in
/// `rerun.spec` stay unset otherwise.
#[must_use]
pub fn rpmbuild_invocation(
    topdir: &Utf8Path,
    module: &ResolvedModule,
    version: ModuleVersion,
    release: u32,
    dist: &str,
    spec: &Utf8Path,
) -> Invocation {
    let requires = requires_clause(&module.requires, &module.externals, version.major);
    let mut defines = vec![
        ("_topdir", topdir.to_string()),
        ("_tmppath", topdir.join("tmp").to_string()),
        ("module", module.name.to_string()),
        ("desc", module.description.trim().to_owned()),
        ("version", module.version.clone()),
        ("release", release.to_string()),
        ("major", version.major.to_string()),
        ("minor", version.minor.to_string()),
        ("revision", version.revision.to_string()),
    ];
    if !requires.is_empty() {
        defines.push(("requires", requires));
    }
    if !dist.is_empty() {
        defines.push(("dist", dist.to_owned()));
    }

    defines
        .into_iter()
        .fold(
            Invocation::new("rpmbuild").args(["-bb", "--target", "noarch"]),
            |inv, (key, value)| inv.arg("--define").arg(format!("{key} {value}")),
        )
        .arg(spec.as_str())
}

#[cfg(test)]
#[path = "rpm_tests.rs"]
mod tests;
