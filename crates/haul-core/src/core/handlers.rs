//! Runs the external tools behind each dispatch entry.
//!
//! Extraction always runs with the staging directory as the working
//! directory and the archive passed as an absolute path, so a handler can
//! only ever write inside staging. Verification never writes at all: tar
//! streams to a sink, the other tools have native test modes.

use std::ffi::OsString;
use std::fs::File;
use std::path::Path;

use tracing::{debug, warn};

use crate::core::config::Tool;
use crate::core::dispatch::{Dispatch, HandlerKind, StreamCodec};
use crate::core::error::{Error, Result};
use crate::core::process::{run_tool, StdoutTo, ToolOutput};

fn codec_tool(codec: StreamCodec) -> Tool {
    match codec {
        StreamCodec::Gzip | StreamCodec::Compress => Tool::Gzip,
        StreamCodec::Xz => Tool::Xz,
    }
}

fn arg(value: &str) -> OsString {
    OsString::from(value)
}

fn path_arg(path: &Path) -> OsString {
    path.as_os_str().to_os_string()
}

/// Extract `archive` into `staging`. The archive path must be absolute.
pub fn extract(dispatch: &Dispatch, archive: &Path, staging: &Path) -> Result<()> {
    let outcome = match dispatch.kind {
        HandlerKind::Tar => run_tool(
            &Tool::Tar.locate()?,
            &[arg("--extract"), arg("--file"), path_arg(archive)],
            staging,
            StdoutTo::Capture,
        )?,
        HandlerKind::Zip => run_tool(
            &Tool::Unzip.locate()?,
            &[arg("-q"), path_arg(archive)],
            staging,
            StdoutTo::Capture,
        )?,
        HandlerKind::SevenZip => run_tool(
            &Tool::SevenZip.locate()?,
            &[arg("x"), path_arg(archive)],
            staging,
            StdoutTo::Capture,
        )?,
        HandlerKind::Stream(codec) => {
            let target = staging.join(&dispatch.stem);
            let file = File::create(&target)
                .map_err(|err| Error::io(format!("creating {}", target.display()), err))?;
            run_tool(
                &codec_tool(codec).locate()?,
                &[arg("--decompress"), arg("--stdout"), path_arg(archive)],
                staging,
                StdoutTo::File(file),
            )?
        }
    };
    if outcome.code == 0 {
        Ok(())
    } else {
        Err(Error::Extraction {
            archive: archive.to_path_buf(),
            detail: failure_detail(&outcome),
            staging: None,
        })
    }
}

/// Run the format's cheap integrity test against a staged archive.
pub fn verify(dispatch: &Dispatch, archive: &Path) -> Result<()> {
    let cwd = archive.parent().unwrap_or(Path::new("."));
    let outcome = match dispatch.kind {
        HandlerKind::Tar => run_tool(
            &Tool::Tar.locate()?,
            &[
                arg("--extract"),
                arg("--to-stdout"),
                arg("--file"),
                path_arg(archive),
            ],
            cwd,
            StdoutTo::Null,
        )?,
        HandlerKind::Zip => run_tool(
            &Tool::Unzip.locate()?,
            &[arg("-t"), arg("-qq"), path_arg(archive)],
            cwd,
            StdoutTo::Capture,
        )?,
        HandlerKind::SevenZip => run_tool(
            &Tool::SevenZip.locate()?,
            &[arg("t"), path_arg(archive)],
            cwd,
            StdoutTo::Capture,
        )?,
        HandlerKind::Stream(codec) => run_tool(
            &codec_tool(codec).locate()?,
            &[arg("--test"), path_arg(archive)],
            cwd,
            StdoutTo::Capture,
        )?,
    };
    if outcome.code == 0 {
        Ok(())
    } else {
        Err(Error::Integrity {
            archive: archive.to_path_buf(),
            detail: failure_detail(&outcome),
        })
    }
}

/// Verify by extracting everything into a scratch directory. The scratch is
/// discarded on success and kept for inspection on failure.
pub fn verify_by_extraction(
    dispatch: &Dispatch,
    archive: &Path,
    scratch_parent: &Path,
) -> Result<()> {
    let scratch = tempfile::Builder::new()
        .prefix(&format!("{}-verify-", dispatch.stem))
        .tempdir_in(scratch_parent)
        .map_err(|err| {
            Error::io(
                format!(
                    "creating scratch directory under {}",
                    scratch_parent.display()
                ),
                err,
            )
        })?;
    debug!(path = %scratch.path().display(), "verifying by full extraction");
    match extract(dispatch, archive, scratch.path()) {
        Ok(()) => Ok(()),
        Err(err) => {
            let kept = scratch.keep();
            warn!(path = %kept.display(), "scratch extraction kept for inspection");
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

fn failure_detail(outcome: &ToolOutput) -> String {
    let mut detail = format!("exit status {}", outcome.code);
    let stream = if outcome.stderr.trim().is_empty() {
        &outcome.stdout
    } else {
        &outcome.stderr
    };
    let tail = stream.trim();
    if !tail.is_empty() {
        detail.push_str(": ");
        detail.push_str(tail);
    }
    detail
}
