use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tracing::info;
use url::Url;

use crate::core::error::{Error, Result};

pub const USER_AGENT: &str = concat!("haul/", env!("CARGO_PKG_VERSION"));

/// Stream `url` into `dest`, creating or truncating it, and return the byte
/// count. Redirects follow the client's default policy; HTTP 4xx/5xx are
/// failures. Once bytes have reached disk a failure names the partial file.
///
/// There is deliberately no request deadline: an archive of unknown size
/// must not be cut off mid-transfer, so a stalled server blocks until the
/// user interrupts.
pub fn fetch_url(url: &Url, dest: &Path) -> Result<u64> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(None)
        .build()
        .map_err(|err| transport(url.as_str(), None, format!("cannot build http client: {err}")))?;

    info!(url = %url, dest = %dest.display(), "downloading");
    let mut response = client
        .get(url.as_str())
        .send()
        .map_err(|err| transport(url.as_str(), None, err.to_string()))?
        .error_for_status()
        .map_err(|err| transport(url.as_str(), None, err.to_string()))?;

    let mut file = File::create(dest)
        .map_err(|err| Error::io(format!("creating staged file {}", dest.display()), err))?;
    let mut written: u64 = 0;
    let mut buffer = [0u8; 65536];
    loop {
        let read = response.read(&mut buffer).map_err(|err| {
            transport(
                url.as_str(),
                partial_if_exists(dest),
                format!("body read failed after {written} bytes: {err}"),
            )
        })?;
        if read == 0 {
            break;
        }
        file.write_all(&buffer[..read]).map_err(|err| {
            transport(
                url.as_str(),
                partial_if_exists(dest),
                format!("write to {} failed: {err}", dest.display()),
            )
        })?;
        written += read as u64;
    }
    file.flush()
        .map_err(|err| Error::io(format!("flushing {}", dest.display()), err))?;
    Ok(written)
}

/// Copy a local source into the staged file, mirroring the remote path's
/// semantics so `file://` and plain-path sources go through the same
/// staging protocol.
pub fn copy_local(source: &Path, dest: &Path) -> Result<u64> {
    if !source.is_file() {
        return Err(transport(
            &source.display().to_string(),
            None,
            "local source does not exist or is not a file".to_string(),
        ));
    }
    info!(source = %source.display(), dest = %dest.display(), "copying local artifact");
    fs::copy(source, dest).map_err(|err| {
        transport(
            &source.display().to_string(),
            partial_if_exists(dest),
            err.to_string(),
        )
    })
}

fn transport(origin: &str, partial: Option<PathBuf>, detail: String) -> Error {
    Error::Transport {
        origin: origin.to_string(),
        detail,
        partial,
    }
}

/// The staged file, when it holds any bytes.
fn partial_if_exists(dest: &Path) -> Option<PathBuf> {
    dest.metadata()
        .ok()
        .filter(|meta| meta.len() > 0)
        .map(|_| dest.to_path_buf())
}
