//! The download, verify, commit, promote pipeline.
//!
//! An archive is only ever visible at `<destination-dir>/<name>` once it has
//! passed its integrity check; until then it lives in a staging directory
//! named `<name>-download-in-progress`. Re-running the same acquisition is a
//! cheap no-op once the archive is committed, which is also the recovery
//! path after an interrupted run.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::core::artifact::{self, Artifact, Source};
use crate::core::dispatch::{self, Dispatch};
use crate::core::error::{Error, Result};
use crate::core::fetch;
use crate::core::handlers;
use crate::core::staging;

/// One acquisition: where to fetch from, where the archive lands, and what
/// to derive from it.
#[derive(Debug, Clone)]
pub struct AcquireRequest {
    /// URL or local path of the archive.
    pub source: String,
    /// Existing directory that receives the committed archive.
    pub destination_dir: PathBuf,
    /// Unpack after verifying and promote the result to this directory.
    pub unpack_to: Option<PathBuf>,
    /// Strip the archive's single top-level directory while promoting.
    pub remove_first_level: bool,
    /// Verify by extracting everything to a scratch directory instead of
    /// streaming to a sink.
    pub test_with_full_extraction: bool,
}

#[derive(Debug)]
pub struct AcquireOutcome {
    /// The committed archive path.
    pub archive: PathBuf,
    /// Whether this run performed the fetch or found the archive cached.
    pub downloaded: bool,
    pub unpacked: Option<UnpackDisposition>,
}

#[derive(Debug)]
pub enum UnpackDisposition {
    /// The requested directory was created from the archive.
    Promoted(PathBuf),
    /// The requested directory already existed and was left alone.
    AlreadyPresent(PathBuf),
}

pub fn acquire(request: &AcquireRequest) -> Result<AcquireOutcome> {
    validate_flags(request)?;
    let artifact = artifact::parse(&request.source)?;
    let dest_dir = resolve_destination_dir(&request.destination_dir)?;
    let dispatch = dispatch::resolve(&artifact.name).ok_or_else(|| Error::UnsupportedFormat {
        name: artifact.name.clone(),
    })?;
    let unpack_dir = match &request.unpack_to {
        Some(dir) => Some(resolve_unpack_dir(dir)?),
        None => None,
    };

    let committed = dest_dir.join(&artifact.name);
    if committed.is_file() {
        info!(archive = %committed.display(), "already present; skipping download");
        return unpack_cached(
            &committed,
            &dispatch,
            unpack_dir.as_deref(),
            request.remove_first_level,
        );
    }

    let staging_dir = staging::ensure_download_staging(&dest_dir, &artifact.name)?;
    let staged = staging_dir.join(&artifact.name);
    if let Err(err) = fetch_into(&artifact, &staged) {
        discard_if_untouched(&staged, &staging_dir);
        return Err(err);
    }

    let extracted = if unpack_dir.is_some() {
        Some(extract_staged(&dispatch, &staged, &staging_dir)?)
    } else {
        if request.test_with_full_extraction {
            handlers::verify_by_extraction(&dispatch, &staged, &staging_dir)?;
        } else {
            handlers::verify(&dispatch, &staged)?;
        }
        None
    };

    info!(from = %staged.display(), to = %committed.display(), "committing");
    staging::move_file(&staged, &committed)?;

    let mut unpacked = None;
    if let (Some(nested), Some(dir)) = (extracted, &unpack_dir) {
        let promoted = promote_to_dir(&nested, dir, request.remove_first_level, true)?;
        unpacked = Some(UnpackDisposition::Promoted(promoted));
    }

    if staging::dir_is_empty(&staging_dir)? {
        info!(path = %staging_dir.display(), "removing staging directory");
        fs::remove_dir(&staging_dir)
            .map_err(|err| Error::io(format!("removing {}", staging_dir.display()), err))?;
    } else {
        return Err(Error::InternalConsistency(format!(
            "staging directory {} is not empty after commit",
            staging_dir.display()
        )));
    }

    Ok(AcquireOutcome {
        archive: committed,
        downloaded: true,
        unpacked,
    })
}

fn validate_flags(request: &AcquireRequest) -> Result<()> {
    if request.unpack_to.is_some() && request.test_with_full_extraction {
        return Err(Error::config(
            "--unpack-to-new-dir and --test-with-full-extraction are mutually exclusive",
        ));
    }
    if request.remove_first_level && request.unpack_to.is_none() {
        return Err(Error::config(
            "--remove-first-level requires --unpack-to-new-dir",
        ));
    }
    Ok(())
}

fn resolve_destination_dir(dir: &Path) -> Result<PathBuf> {
    let metadata = fs::metadata(dir).map_err(|_| {
        Error::config(format!(
            "destination directory {} does not exist",
            dir.display()
        ))
    })?;
    if !metadata.is_dir() {
        return Err(Error::config(format!(
            "destination path {} is not a directory",
            dir.display()
        )));
    }
    dir.canonicalize()
        .map_err(|err| Error::io(format!("resolving {}", dir.display()), err))
}

/// Resolve the requested unpack directory to an absolute path. The directory
/// itself may be absent (it usually is), but its parent must exist.
fn resolve_unpack_dir(dir: &Path) -> Result<PathBuf> {
    let absolute = if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|err| Error::io("resolving the current directory".to_string(), err))?
            .join(dir)
    };
    let Some(name) = absolute.file_name() else {
        return Err(Error::config(format!(
            "{} cannot name a new directory",
            dir.display()
        )));
    };
    let Some(parent) = absolute.parent() else {
        return Err(Error::config(format!(
            "{} cannot name a new directory",
            dir.display()
        )));
    };
    let parent = parent.canonicalize().map_err(|_| {
        Error::config(format!(
            "parent directory {} of the unpack directory does not exist",
            parent.display()
        ))
    })?;
    if !parent.is_dir() {
        return Err(Error::config(format!(
            "parent {} of the unpack directory is not a directory",
            parent.display()
        )));
    }
    Ok(parent.join(name))
}

fn fetch_into(artifact: &Artifact, staged: &Path) -> Result<u64> {
    match &artifact.source {
        Source::Remote(url) => fetch::fetch_url(url, staged),
        Source::Local(path) => fetch::copy_local(path, staged),
    }
}

/// Drop a zero-byte staged file and the staging directory when a failed
/// fetch wrote nothing worth keeping. Anything with actual bytes stays.
fn discard_if_untouched(staged: &Path, staging_dir: &Path) {
    if let Ok(metadata) = fs::metadata(staged) {
        if metadata.len() == 0 {
            let _ = fs::remove_file(staged);
        }
    }
    if staging::dir_is_empty(staging_dir).unwrap_or(false) {
        let _ = fs::remove_dir(staging_dir);
    }
}

/// Extract a staged archive into a fresh directory under `staging_parent`
/// and return that directory. An extraction failure here means the archive
/// itself is bad, so it is reported as an integrity failure naming the
/// archive; a partially-filled extraction directory is kept for inspection.
fn extract_staged(dispatch: &Dispatch, archive: &Path, staging_parent: &Path) -> Result<PathBuf> {
    let nested = staging::create_unpack_staging(staging_parent, &dispatch.stem)?;
    match handlers::extract(dispatch, archive, &nested) {
        Ok(()) => Ok(nested),
        Err(err) => {
            if staging::dir_is_empty(&nested).unwrap_or(false) {
                let _ = fs::remove_dir(&nested);
            } else {
                warn!(path = %nested.display(), "partial extraction kept for inspection");
            }
            Err(match err {
                Error::Extraction { detail, .. } => Error::Integrity {
                    archive: archive.to_path_buf(),
                    detail,
                },
                other => other,
            })
        }
    }
}

fn unpack_cached(
    committed: &Path,
    dispatch: &Dispatch,
    unpack_dir: Option<&Path>,
    remove_first_level: bool,
) -> Result<AcquireOutcome> {
    let Some(dir) = unpack_dir else {
        return Ok(AcquireOutcome {
            archive: committed.to_path_buf(),
            downloaded: false,
            unpacked: None,
        });
    };
    if dir.exists() {
        info!(path = %dir.display(), "unpack directory already present; nothing to do");
        return Ok(AcquireOutcome {
            archive: committed.to_path_buf(),
            downloaded: false,
            unpacked: Some(UnpackDisposition::AlreadyPresent(dir.to_path_buf())),
        });
    }
    let Some(parent) = dir.parent() else {
        return Err(Error::InternalConsistency(format!(
            "unpack directory {} has no parent",
            dir.display()
        )));
    };
    let nested = extract_staged(dispatch, committed, parent)?;
    let promoted = promote_to_dir(&nested, dir, remove_first_level, false)?;
    Ok(AcquireOutcome {
        archive: committed.to_path_buf(),
        downloaded: false,
        unpacked: Some(UnpackDisposition::Promoted(promoted)),
    })
}

/// Move extracted content to the requested directory.
///
/// An existing directory at the target is replaced only when this run just
/// downloaded a fresh archive. When unpacking from cache the caller has
/// already established the target is absent, so finding one is a logic bug.
fn promote_to_dir(
    nested: &Path,
    dir: &Path,
    remove_first_level: bool,
    fresh_download: bool,
) -> Result<PathBuf> {
    let source = if remove_first_level {
        let Some(inner) = single_top_level_dir(nested)? else {
            return Err(Error::config(
                "cannot remove the first level: the archive does not contain \
                 exactly one top-level directory",
            ));
        };
        inner
    } else {
        nested.to_path_buf()
    };

    if dir.exists() {
        if fresh_download {
            info!(path = %dir.display(), "removing stale unpack directory");
            fs::remove_dir_all(dir)
                .map_err(|err| Error::io(format!("removing {}", dir.display()), err))?;
        } else {
            return Err(Error::InternalConsistency(format!(
                "{} appeared while unpacking from the cached archive",
                dir.display()
            )));
        }
    }

    info!(from = %source.display(), to = %dir.display(), "promoting");
    staging::move_dir(&source, dir)?;
    if remove_first_level {
        fs::remove_dir(nested)
            .map_err(|err| Error::io(format!("removing {}", nested.display()), err))?;
    }
    Ok(dir.to_path_buf())
}

fn single_top_level_dir(nested: &Path) -> Result<Option<PathBuf>> {
    let entries = staging::list_entries(nested)?;
    if let [entry] = entries.as_slice() {
        let file_type = entry.file_type().map_err(|err| {
            Error::io(format!("inspecting {}", entry.path().display()), err)
        })?;
        if file_type.is_dir() {
            return Ok(Some(entry.path()));
        }
    }
    Ok(None)
}
