//! Staged archive extraction.
//!
//! Archives are never extracted straight into the output directory. Each
//! run extracts into a fresh staging directory beside the final location,
//! decides what the promoted name should be, and renames the result into
//! place. A crash at any point leaves either nothing or a clearly named
//! staging directory; it never leaves a half-written result under the
//! final name.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::core::dispatch::{self, Dispatch};
use crate::core::error::{Error, Result};
use crate::core::handlers;
use crate::core::staging;

/// What to unpack and where the result should land.
#[derive(Debug, Clone)]
pub struct UnpackRequest {
    pub archive: PathBuf,
    pub output_dir: PathBuf,
}

/// A completed unpack run.
#[derive(Debug)]
pub struct Unpacked {
    pub archive: PathBuf,
    pub promotion: Promotion,
}

/// Where the extracted content ended up.
#[derive(Debug)]
pub enum Promotion {
    /// The content was renamed to its final path.
    Promoted(PathBuf),
    /// The final path was already occupied, so the content stays in
    /// staging. This is a success: the archive extracted cleanly and
    /// nothing existing was touched.
    LeftInStaging { staging: PathBuf, occupied: PathBuf },
}

pub fn unpack(request: &UnpackRequest) -> Result<Unpacked> {
    let output_dir = resolve_output_dir(&request.output_dir)?;
    let archive = resolve_archive(&request.archive)?;
    let dispatch = dispatch_for(&archive)?;

    let staging = staging::create_unpack_staging(&output_dir, &dispatch.stem)?;
    if let Err(err) = handlers::extract(&dispatch, &archive, &staging) {
        return Err(fail_with_staging(err, &staging));
    }
    let promotion = promote(&staging, &output_dir, &dispatch.stem)?;
    Ok(Unpacked { archive, promotion })
}

fn resolve_output_dir(dir: &Path) -> Result<PathBuf> {
    let metadata = fs::metadata(dir).map_err(|_| {
        Error::config(format!(
            "output directory {} does not exist",
            dir.display()
        ))
    })?;
    if !metadata.is_dir() {
        return Err(Error::config(format!(
            "output path {} is not a directory",
            dir.display()
        )));
    }
    dir.canonicalize()
        .map_err(|err| Error::io(format!("resolving {}", dir.display()), err))
}

fn resolve_archive(path: &Path) -> Result<PathBuf> {
    let metadata = fs::metadata(path).map_err(|_| Error::NotFound {
        path: path.to_path_buf(),
    })?;
    if metadata.is_dir() {
        return Err(Error::NotAnArchive {
            path: path.to_path_buf(),
        });
    }
    path.canonicalize()
        .map_err(|err| Error::io(format!("resolving {}", path.display()), err))
}

fn dispatch_for(archive: &Path) -> Result<Dispatch> {
    let name = archive
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    dispatch::resolve(&name).ok_or(Error::UnsupportedFormat { name })
}

/// Attach the staging path to an extraction failure, unless staging is
/// still empty, in which case it is removed and the error kept clean.
fn fail_with_staging(err: Error, staging: &Path) -> Error {
    if staging::dir_is_empty(staging).unwrap_or(false) {
        let _ = fs::remove_dir(staging);
        return err;
    }
    match err {
        Error::Extraction {
            archive, detail, ..
        } => Error::Extraction {
            archive,
            detail,
            staging: Some(staging.to_path_buf()),
        },
        other => other,
    }
}

/// Rename the staged content into the output directory.
///
/// A single top-level entry keeps its own name; anything else moves wholesale
/// under the archive's stem. If the chosen name is already taken the staged
/// content is left where it is and reported, not merged or replaced.
fn promote(staging: &Path, output_dir: &Path, stem: &str) -> Result<Promotion> {
    let entries = staging::list_entries(staging)?;
    if let [entry] = entries.as_slice() {
        let target = output_dir.join(entry.file_name());
        if target.exists() {
            return left_in_staging(staging, target);
        }
        let source = entry.path();
        let file_type = entry
            .file_type()
            .map_err(|err| Error::io(format!("inspecting {}", source.display()), err))?;
        info!(from = %source.display(), to = %target.display(), "promoting");
        if file_type.is_dir() {
            staging::move_dir(&source, &target)?;
        } else {
            staging::move_file(&source, &target)?;
        }
        fs::remove_dir(staging)
            .map_err(|err| Error::io(format!("removing {}", staging.display()), err))?;
        return Ok(Promotion::Promoted(target));
    }

    let target = output_dir.join(stem);
    if target.exists() {
        return left_in_staging(staging, target);
    }
    info!(from = %staging.display(), to = %target.display(), "promoting");
    staging::move_dir(staging, &target)?;
    Ok(Promotion::Promoted(target))
}

fn left_in_staging(staging: &Path, occupied: PathBuf) -> Result<Promotion> {
    info!(
        staging = %staging.display(),
        occupied = %occupied.display(),
        "target name taken; extracted content left in staging"
    );
    Ok(Promotion::LeftInStaging {
        staging: staging.to_path_buf(),
        occupied,
    })
}
