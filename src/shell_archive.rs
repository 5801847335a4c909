//! Self-extracting shell archives.
//!
//! A shell archive bundles any number of modules together with a copy of
//! the framework executable into one script. The script is the rendered
//! `extract` template followed by the base64 (or uuencoded) text of a
//! gzipped tarball; at run time the script decodes its own tail, unpacks it
//! and hands over to the bundled `launcher`.
//!
//! Payload layout:
//!
//! ```text
//! extract
//! launcher
//! rerun/rerun
//! rerun/modules/<name>/...
//! ```

use crate::context::BuildContext;
use crate::error::{ArchiveError, Result};
use crate::executor::{Invocation, run_checked};
use crate::fsutil::{require_file, set_executable};
use crate::metadata::load_metadata;
use crate::module_name::ModuleName;
use crate::registry::has_commands_dir;
use crate::request::BuildRequest;
use crate::template::{TemplateTokens, render_to};
use crate::workspace::StagingWorkspace;
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info, warn};
use std::fs::File;
use std::io;

/// Output file name used when the request names none.
pub const DEFAULT_ARCHIVE_NAME: &str = "rerun.sh";

/// Value of the `@GENERATOR@` token.
pub const GENERATOR: &str = concat!("rerun-archive ", env!("CARGO_PKG_VERSION"));

/// Template rendered into the archive header.
pub const EXTRACT_TEMPLATE: &str = "extract";

/// Template rendered into the payload's entry point.
pub const LAUNCHER_TEMPLATE: &str = "launcher";

/// Directory of the framework copy inside the payload.
const RUNTIME_DIR: &str = "rerun";

/// Resolve where the archive is written.
///
/// Defaults to [`DEFAULT_ARCHIVE_NAME`] in `working_dir`; relative paths are
/// taken relative to `working_dir`.
///
/// # Errors
///
/// Returns [`ArchiveError::OutputDirectoryMissing`] if the parent directory
/// does not exist.
pub fn output_path(working_dir: &Utf8Path, file: Option<&Utf8Path>) -> Result<Utf8PathBuf> {
    let path = match file {
        Some(file) if file.is_absolute() => file.to_owned(),
        Some(file) => working_dir.join(file),
        None => working_dir.join(DEFAULT_ARCHIVE_NAME),
    };
    let parent = path.parent().unwrap_or(working_dir);
    if !parent.is_dir() {
        return Err(ArchiveError::OutputDirectoryMissing {
            path: parent.to_owned(),
        });
    }
    Ok(path)
}

/// Settle the archive's version.
///
/// An explicit override always wins. A single-module archive inherits that
/// module's declared version.
///
/// # Errors
///
/// Returns [`ArchiveError::MissingVersion`] when neither applies, the
/// registry's error if the single module cannot be resolved, or
/// [`ArchiveError::MetadataUnreadable`] if its metadata exists but cannot be
/// read.
pub fn resolve_version(ctx: &BuildContext<'_>, request: &BuildRequest) -> Result<String> {
    if let Some(version) = request.version_override() {
        return Ok(version.to_owned());
    }
    let [only] = request.modules.as_slice() else {
        return Err(ArchiveError::MissingVersion);
    };

    let dir = ctx.registry.resolve(only)?;
    let declared = match load_metadata(&dir) {
        Ok(metadata) => Some(metadata.version.trim().to_owned()),
        Err(ArchiveError::MetadataUnreadable { source, .. })
            if source.kind() == io::ErrorKind::NotFound =>
        {
            None
        }
        Err(err) => return Err(err),
    };
    declared
        .filter(|v| !v.is_empty())
        .inspect(|v| debug!("inheriting version {v} from module {only}"))
        .ok_or(ArchiveError::MissingVersion)
}

/// Build a shell archive for `request` and return its path.
///
/// Modules without a `commands/` directory are skipped with a warning.
/// Every precondition (output directory, version, encoder, framework
/// executable) is checked before anything is staged.
///
/// # Errors
///
/// Returns the first validation, lookup or toolchain failure.
pub fn build(ctx: &BuildContext<'_>, request: &BuildRequest) -> Result<Utf8PathBuf> {
    let output = output_path(&ctx.working_dir, request.file.as_deref())?;
    let version = resolve_version(ctx, request)?;
    let encoding = ctx.encoding.ok_or(ArchiveError::NoEncoder)?;
    let runtime = ctx.host.executable()?;
    let template_dir = ctx.template_dir_for(request.template.as_deref());

    let workspace = StagingWorkspace::create()?;
    let payload = workspace.create_dir("payload")?;
    let modules_dir = payload.join(RUNTIME_DIR).join("modules");
    std::fs::create_dir_all(&modules_dir)?;

    for name in &request.modules {
        let dir = ctx.registry.resolve(name)?;
        if !has_commands_dir(&dir) {
            warn!("skipping module {name}: {dir} has no commands directory");
            continue;
        }
        stage_module(ctx, &workspace, name, &dir, &modules_dir)?;
        info!("added module {name} to {output}");
    }

    let runtime_copy = payload.join(RUNTIME_DIR).join("rerun");
    std::fs::copy(runtime, &runtime_copy)?;
    set_executable(&runtime_copy)?;

    let tokens = TemplateTokens {
        generator: GENERATOR.to_owned(),
        archive: output.file_name().unwrap_or(DEFAULT_ARCHIVE_NAME).to_owned(),
        date: ctx.timestamp.to_rfc2822(),
        user: ctx.user.clone(),
        version,
        release: request.release.to_string(),
        decoder: encoding.decoder_command().to_owned(),
    };
    for name in [EXTRACT_TEMPLATE, LAUNCHER_TEMPLATE] {
        let script = payload.join(name);
        render_to(template_dir, name, &tokens, &script)?;
        set_executable(&script)?;
    }

    let tarball = workspace.join("payload.tar");
    run_checked(
        ctx.executor,
        &Invocation::new("tar")
            .args(["-cf", tarball.as_str(), "-C", payload.as_str()])
            .args([EXTRACT_TEMPLATE, LAUNCHER_TEMPLATE, RUNTIME_DIR]),
    )?;
    require_file(&tarball)?;

    run_checked(ctx.executor, &Invocation::new("gzip").args(["-f", tarball.as_str()]))?;
    let compressed = workspace.join("payload.tar.gz");
    require_file(&compressed)?;

    let encoded = workspace.join("payload.tar.gz.txt");
    encoding.encode(ctx.executor, &compressed, &encoded)?;

    concatenate(&[&payload.join(EXTRACT_TEMPLATE), &encoded], &output)?;
    set_executable(&output)?;

    workspace.close()?;
    info!("wrote {output}");
    Ok(output)
}

/// Copy a module into the payload through a tar round trip, which drops
/// version-control files and filesystem metadata the archive should not
/// carry.
fn stage_module(
    ctx: &BuildContext<'_>,
    workspace: &StagingWorkspace,
    name: &ModuleName,
    dir: &Utf8Path,
    modules_dir: &Utf8Path,
) -> Result<()> {
    let (parent, entry) = match (dir.parent(), dir.file_name()) {
        (Some(parent), Some(entry)) => (parent, entry),
        _ => {
            return Err(ArchiveError::ModuleNotFound { name: name.clone() });
        }
    };
    let tarball = workspace.join(format!("module-{name}.tar"));

    run_checked(
        ctx.executor,
        &Invocation::new("tar")
            .args(["-cf", tarball.as_str()])
            .args(ctx.platform.vcs_exclude_flags())
            .args(["-C", parent.as_str(), entry]),
    )?;
    run_checked(
        ctx.executor,
        &Invocation::new("tar").args(["-xf", tarball.as_str(), "-C", modules_dir.as_str()]),
    )?;
    Ok(())
}

/// Write `parts` one after another into `output`.
fn concatenate(parts: &[&Utf8Path], output: &Utf8Path) -> Result<()> {
    let mut out = File::create(output)?;
    for part in parts {
        let mut input = File::open(part).map_err(|_| ArchiveError::MissingIntermediate {
            path: (*part).to_owned(),
        })?;
        io::copy(&mut input, &mut out)?;
    }
    out.sync_all()?;
    Ok(())
}

#[cfg(test)]
#[path = "shell_archive_tests.rs"]
mod tests;
