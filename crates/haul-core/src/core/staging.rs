//! Staging directories and the renames that promote out of them.
//!
//! Every destructive-looking operation here is announced before it runs;
//! nothing in this module deletes content that is not an empty directory,
//! a source that was just copied, or a staged copy it created itself.

use std::fs;
use std::io;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};

use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use tracing::info;
use walkdir::WalkDir;

use crate::core::error::{Error, Result};

/// Name of the download staging directory for an artifact.
#[must_use]
pub fn download_staging_name(artifact: &str) -> String {
    format!("{artifact}-download-in-progress")
}

/// Create the download staging directory under `dest_dir`, reusing a
/// leftover one from an interrupted run.
pub fn ensure_download_staging(dest_dir: &Path, artifact: &str) -> Result<PathBuf> {
    let staging = dest_dir.join(download_staging_name(artifact));
    if !staging.is_dir() {
        info!(path = %staging.display(), "creating staging directory");
        fs::create_dir(&staging).map_err(|err| {
            Error::io(
                format!("creating staging directory {}", staging.display()),
                err,
            )
        })?;
    }
    Ok(staging)
}

/// Create a fresh `<stem>-unpacked-<suffix>` staging directory under
/// `parent`, retrying on the unlikely name collision.
pub fn create_unpack_staging(parent: &Path, stem: &str) -> Result<PathBuf> {
    loop {
        let suffix: String = thread_rng()
            .sample_iter(Alphanumeric)
            .take(6)
            .map(char::from)
            .collect();
        let candidate = parent.join(format!("{stem}-unpacked-{suffix}"));
        info!(path = %candidate.display(), "creating staging directory");
        match fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {}
            Err(err) => {
                return Err(Error::io(
                    format!("creating staging directory {}", candidate.display()),
                    err,
                ));
            }
        }
    }
}

/// Move a file by rename. Across devices the bytes are copied to a staged
/// sibling of the destination first, so the final name only ever appears
/// by rename.
pub fn move_file(src: &Path, dest: &Path) -> Result<()> {
    match fs::rename(src, dest) {
        Ok(()) => Ok(()),
        Err(err) if is_cross_device(&err) => copy_file_across_devices(src, dest),
        Err(err) => Err(Error::io(
            format!("renaming {} to {}", src.display(), dest.display()),
            err,
        )),
    }
}

/// Move a directory by rename. Across devices the tree is copied into a
/// staged directory beside the destination and renamed into place, so a
/// half-copied tree never sits under the final name.
pub fn move_dir(src: &Path, dest: &Path) -> Result<()> {
    match fs::rename(src, dest) {
        Ok(()) => Ok(()),
        Err(err) if is_cross_device(&err) => copy_dir_across_devices(src, dest),
        Err(err) => Err(Error::io(
            format!("renaming {} to {}", src.display(), dest.display()),
            err,
        )),
    }
}

fn is_cross_device(err: &io::Error) -> bool {
    matches!(err.raw_os_error(), Some(18))
}

fn copy_file_across_devices(src: &Path, dest: &Path) -> Result<()> {
    let parent = dest.parent().ok_or_else(|| {
        Error::InternalConsistency(format!("{} has no parent directory", dest.display()))
    })?;
    let name = dest
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let staged = tempfile::Builder::new()
        .prefix(&format!("{name}-copy-"))
        .tempfile_in(parent)
        .map_err(|err| Error::io(format!("staging a copy beside {}", dest.display()), err))?;
    fs::copy(src, staged.path()).map_err(|err| {
        Error::io(
            format!("copying {} to {}", src.display(), staged.path().display()),
            err,
        )
    })?;
    staged
        .persist(dest)
        .map_err(|err| Error::io(format!("renaming into {}", dest.display()), err.error))?;
    fs::remove_file(src).map_err(|err| Error::io(format!("removing {}", src.display()), err))
}

fn copy_dir_across_devices(src: &Path, dest: &Path) -> Result<()> {
    let parent = dest.parent().ok_or_else(|| {
        Error::InternalConsistency(format!("{} has no parent directory", dest.display()))
    })?;
    let stem = dest
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let staging = create_unpack_staging(parent, &stem)?;
    if let Err(err) = copy_tree(src, &staging) {
        let _ = fs::remove_dir_all(&staging);
        return Err(err);
    }
    fs::rename(&staging, dest).map_err(|err| {
        let _ = fs::remove_dir_all(&staging);
        Error::io(
            format!("renaming {} to {}", staging.display(), dest.display()),
            err,
        )
    })?;
    fs::remove_dir_all(src).map_err(|err| Error::io(format!("removing {}", src.display()), err))
}

/// Copy `src` recursively into the existing directory `dest`. Symlinks are
/// recreated from their link targets, never followed.
fn copy_tree(src: &Path, dest: &Path) -> Result<()> {
    for entry in WalkDir::new(src) {
        let entry =
            entry.map_err(|err| Error::io(format!("walking {}", src.display()), err.into()))?;
        let relative = entry.path().strip_prefix(src).map_err(|_| {
            Error::InternalConsistency(format!(
                "{} escaped its walk root {}",
                entry.path().display(),
                src.display()
            ))
        })?;
        let target = dest.join(relative);
        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&target)
                .map_err(|err| Error::io(format!("creating {}", target.display()), err))?;
        } else if file_type.is_symlink() {
            let link_target = fs::read_link(entry.path()).map_err(|err| {
                Error::io(format!("reading link {}", entry.path().display()), err)
            })?;
            symlink(&link_target, &target)
                .map_err(|err| Error::io(format!("linking {}", target.display()), err))?;
        } else {
            fs::copy(entry.path(), &target).map_err(|err| {
                Error::io(
                    format!("copying {} to {}", entry.path().display(), target.display()),
                    err,
                )
            })?;
        }
    }
    Ok(())
}

/// Whether `path` is a directory with no entries at all, hidden included.
pub fn dir_is_empty(path: &Path) -> Result<bool> {
    let mut entries = fs::read_dir(path)
        .map_err(|err| Error::io(format!("reading directory {}", path.display()), err))?;
    Ok(entries.next().is_none())
}

/// Top-level entries of `path`, hidden entries included.
pub fn list_entries(path: &Path) -> Result<Vec<fs::DirEntry>> {
    let reader = fs::read_dir(path)
        .map_err(|err| Error::io(format!("reading directory {}", path.display()), err))?;
    let mut entries = Vec::new();
    for entry in reader {
        entries
            .push(entry.map_err(|err| Error::io(format!("reading {}", path.display()), err))?);
    }
    Ok(entries)
}
