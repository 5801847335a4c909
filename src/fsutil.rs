//! Filesystem helpers shared by the builders.

use crate::error::{ArchiveError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Convert a standard path into a UTF-8 path.
///
/// # Errors
///
/// Returns [`ArchiveError::NonUtf8Path`] if the path is not valid UTF-8.
pub fn utf8_path(path: PathBuf) -> Result<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(path).map_err(|p| ArchiveError::NonUtf8Path {
        path: p.to_string_lossy().into_owned(),
    })
}

/// Recursively copy `src` to `dst`, preserving file modes and symlinks.
///
/// `dst` is created if needed. Directory modes are applied after their
/// contents are copied so read-only source directories copy cleanly.
///
/// # Errors
///
/// Returns [`ArchiveError::Io`] on any filesystem failure.
pub fn copy_tree(src: &Utf8Path, dst: &Utf8Path) -> Result<()> {
    copy_dir(src.as_std_path(), dst.as_std_path())?;
    Ok(())
}

fn copy_dir(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir_all(dst)?;

    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let target = dst.join(entry.file_name());

        if file_type.is_dir() {
            copy_dir(&entry.path(), &target)?;
        } else if file_type.is_symlink() {
            copy_symlink(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }

    fs::set_permissions(dst, fs::metadata(src)?.permissions())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(fs::read_link(src)?, dst)
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    fs::copy(src, dst).map(|_| ())
}

/// Grant the owner write access throughout the tree at `root`.
///
/// Directories become at least `u+rwx` and files at least `u+rw`. Symlinks
/// are left alone.
///
/// # Errors
///
/// Returns the first I/O error encountered.
pub fn make_writable(root: &Path) -> io::Result<()> {
    let metadata = fs::symlink_metadata(root)?;
    if metadata.file_type().is_symlink() {
        return Ok(());
    }

    add_owner_access(root, &metadata)?;
    if metadata.is_dir() {
        for entry in fs::read_dir(root)? {
            make_writable(&entry?.path())?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn add_owner_access(path: &Path, metadata: &fs::Metadata) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let wanted = if metadata.is_dir() { 0o700 } else { 0o600 };
    let mut perms = metadata.permissions();
    if perms.mode() & wanted != wanted {
        perms.set_mode(perms.mode() | wanted);
        fs::set_permissions(path, perms)?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn add_owner_access(path: &Path, metadata: &fs::Metadata) -> io::Result<()> {
    let mut perms = metadata.permissions();
    if perms.readonly() {
        perms.set_readonly(false);
        fs::set_permissions(path, perms)?;
    }
    Ok(())
}

/// Returns true if the owner can write to `path`.
#[must_use]
pub fn is_writable(path: &Utf8Path) -> bool {
    fs::metadata(path).is_ok_and(|m| !m.permissions().readonly())
}

/// Mark `path` as executable (`rwxr-xr-x`).
///
/// # Errors
///
/// Returns [`ArchiveError::Io`] if the permissions cannot be changed.
#[cfg(unix)]
pub fn set_executable(path: &Utf8Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms)?;
    Ok(())
}

/// Mark `path` as executable. A no-op where modes do not exist.
///
/// # Errors
///
/// Returns [`ArchiveError::Io`] if `path` does not exist.
#[cfg(not(unix))]
pub fn set_executable(path: &Utf8Path) -> Result<()> {
    fs::metadata(path)?;
    Ok(())
}

/// Move `file` into `dest_dir`, keeping its file name.
///
/// Tries a rename first and falls back to copy-then-remove when the two
/// locations are on different filesystems.
///
/// # Errors
///
/// Returns [`ArchiveError::Io`] if neither strategy succeeds, or
/// [`ArchiveError::MissingIntermediate`] if `file` has no file name.
pub fn relocate(file: &Utf8Path, dest_dir: &Utf8Path) -> Result<Utf8PathBuf> {
    let name = file
        .file_name()
        .ok_or_else(|| ArchiveError::MissingIntermediate {
            path: file.to_owned(),
        })?;
    let dest = dest_dir.join(name);

    if let Err(err) = fs::rename(file, &dest) {
        debug!("rename {file} -> {dest} failed ({err}); copying instead");
        fs::copy(file, &dest)?;
        fs::remove_file(file)?;
    }
    Ok(dest)
}

/// Files in `dir` whose names match the glob `pattern`, sorted.
///
/// `dir` is matched literally; only `pattern` is interpreted.
///
/// # Errors
///
/// Returns [`ArchiveError::Io`] if `pattern` is malformed or an entry cannot
/// be read.
pub fn matching_files(dir: &Utf8Path, pattern: &str) -> Result<Vec<Utf8PathBuf>> {
    let full = format!("{}/{pattern}", glob::Pattern::escape(dir.as_str()));
    let mut files = Vec::new();
    for entry in glob::glob(&full).map_err(io::Error::other)? {
        let path = utf8_path(entry.map_err(glob::GlobError::into_error)?)?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Fail unless `path` exists as a file.
///
/// # Errors
///
/// Returns [`ArchiveError::MissingIntermediate`].
pub fn require_file(path: &Utf8Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ArchiveError::MissingIntermediate {
            path: path.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn root() -> (TempDir, Utf8PathBuf) {
        let temp = TempDir::new().expect("temp dir");
        let root = utf8_path(temp.path().to_path_buf()).expect("utf8");
        (temp, root)
    }

    #[rstest]
    fn copy_tree_copies_nested_files(root: (TempDir, Utf8PathBuf)) {
        let (_temp, root) = root;
        let src = root.join("src");
        fs::create_dir_all(src.join("commands/start")).expect("mkdir");
        fs::write(src.join("metadata"), "NAME=foo\n").expect("write metadata");
        fs::write(src.join("commands/start/script"), "#!/bin/sh\n").expect("write script");

        let dst = root.join("out/foo");
        copy_tree(&src, &dst).expect("copy succeeds");

        assert_eq!(
            fs::read_to_string(dst.join("metadata")).expect("read"),
            "NAME=foo\n"
        );
        assert!(dst.join("commands/start/script").is_file());
    }

    #[cfg(unix)]
    #[rstest]
    fn copy_tree_preserves_modes_and_links(root: (TempDir, Utf8PathBuf)) {
        use std::os::unix::fs::PermissionsExt;

        let (_temp, root) = root;
        let src = root.join("src");
        fs::create_dir_all(&src).expect("mkdir");
        let script = src.join("script");
        fs::write(&script, "#!/bin/sh\n").expect("write");
        set_executable(&script).expect("chmod");
        std::os::unix::fs::symlink("script", src.join("alias")).expect("symlink");

        let dst = root.join("dst");
        copy_tree(&src, &dst).expect("copy succeeds");

        let mode = fs::metadata(dst.join("script")).expect("stat").permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
        assert_eq!(
            fs::read_link(dst.join("alias")).expect("readlink"),
            Path::new("script")
        );
    }

    #[cfg(unix)]
    #[rstest]
    fn make_writable_restores_owner_access(root: (TempDir, Utf8PathBuf)) {
        use std::os::unix::fs::PermissionsExt;

        let (_temp, root) = root;
        let dir = root.join("locked");
        fs::create_dir_all(&dir).expect("mkdir");
        let file = dir.join("file");
        fs::write(&file, "x").expect("write");
        fs::set_permissions(&file, fs::Permissions::from_mode(0o444)).expect("chmod file");
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o555)).expect("chmod dir");

        make_writable(dir.as_std_path()).expect("normalise");

        assert!(is_writable(&dir));
        assert!(is_writable(&file));
    }

    #[rstest]
    fn relocate_moves_file_into_directory(root: (TempDir, Utf8PathBuf)) {
        let (_temp, root) = root;
        let file = root.join("rerun-foo-1.0.0-1.noarch.rpm");
        fs::write(&file, "rpm").expect("write");
        let dest_dir = root.join("out");
        fs::create_dir_all(&dest_dir).expect("mkdir");

        let dest = relocate(&file, &dest_dir).expect("relocate");

        assert_eq!(dest, dest_dir.join("rerun-foo-1.0.0-1.noarch.rpm"));
        assert!(dest.is_file());
        assert!(!file.exists());
    }

    #[rstest]
    fn matching_files_treats_the_directory_literally(root: (TempDir, Utf8PathBuf)) {
        let (_temp, root) = root;
        let dir = root.join("build[1]");
        fs::create_dir_all(&dir).expect("mkdir");
        fs::write(dir.join("rerun-foo-1.0.0-1.noarch.rpm"), "rpm").expect("write");
        fs::write(dir.join("rerun-bar-1.0.0-1.noarch.rpm"), "rpm").expect("write");

        let found = matching_files(&dir, "rerun-foo-*.rpm").expect("glob");

        assert_eq!(found, vec![dir.join("rerun-foo-1.0.0-1.noarch.rpm")]);
    }

    #[rstest]
    fn matching_files_rejects_a_malformed_pattern(root: (TempDir, Utf8PathBuf)) {
        let (_temp, root) = root;
        let err = matching_files(&root, "rerun-[").expect_err("bad pattern");
        assert!(matches!(err, ArchiveError::Io(_)));
        assert_eq!(err.exit_code(), 1);
    }

    #[rstest]
    fn require_file_reports_missing_path(root: (TempDir, Utf8PathBuf)) {
        let (_temp, root) = root;
        let err = require_file(&root.join("payload.tgz")).expect_err("missing");
        assert!(matches!(err, ArchiveError::MissingIntermediate { .. }));
    }
}
