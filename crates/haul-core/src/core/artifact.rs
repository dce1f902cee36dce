use std::path::PathBuf;

use url::Url;

use crate::core::error::{Error, Result};

/// Where an artifact comes from.
#[derive(Debug, Clone)]
pub enum Source {
    /// An http(s) URL fetched over the network.
    Remote(Url),
    /// A local file, given either as a `file://` URL or a plain path.
    Local(PathBuf),
}

/// A parsed acquisition source plus the artifact name derived from it.
///
/// The name is the final path segment of the source, taken verbatim: it
/// becomes the committed file name, the staging directory prefix, and the
/// dispatch key.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub source: Source,
    pub name: String,
}

/// Parse a raw source string. Anything that does not parse as an absolute
/// URL is treated as a local path.
pub fn parse(raw: &str) -> Result<Artifact> {
    if let Ok(url) = Url::parse(raw) {
        return match url.scheme() {
            "http" | "https" => {
                let name = remote_name(&url)?;
                Ok(Artifact {
                    source: Source::Remote(url),
                    name,
                })
            }
            "file" => {
                let path = url.to_file_path().map_err(|()| {
                    Error::config(format!("cannot turn {url} into a local path"))
                })?;
                local(path)
            }
            other => Err(Error::config(format!(
                "unsupported URL scheme {other}:// in {raw}"
            ))),
        };
    }
    local(PathBuf::from(raw))
}

fn local(path: PathBuf) -> Result<Artifact> {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .map(ToString::to_string)
        .ok_or_else(|| {
            Error::config(format!(
                "cannot derive an artifact name from {}",
                path.display()
            ))
        })?;
    Ok(Artifact {
        source: Source::Local(path),
        name,
    })
}

fn remote_name(url: &Url) -> Result<String> {
    url.path_segments()
        .and_then(|segments| segments.rev().find(|segment| !segment.is_empty()))
        .map(ToString::to_string)
        .ok_or_else(|| Error::config(format!("{url} has no file name to derive an artifact from")))
}
