use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline failures. Variants that leave staged state behind carry the path
/// a user should inspect, so callers never have to reconstruct it from logs.
#[derive(Debug, Error)]
pub enum Error {
    /// The request itself is unusable: missing directories, conflicting
    /// options, a source no name can be derived from.
    #[error("{0}")]
    Configuration(String),

    /// The fetch failed. `partial` names the staged partial download when
    /// any bytes reached disk.
    #[error("fetching {origin} failed: {detail}")]
    Transport {
        origin: String,
        detail: String,
        partial: Option<PathBuf>,
    },

    /// The staged archive failed its format check. The file is kept.
    #[error("integrity check failed for {}: {detail}", .archive.display())]
    Integrity { archive: PathBuf, detail: String },

    /// No dispatch entry matches the file name.
    #[error("unsupported archive format: {name}")]
    UnsupportedFormat { name: String },

    /// The archive path does not exist.
    #[error("archive not found: {}", .path.display())]
    NotFound { path: PathBuf },

    /// The archive path is a directory, typically the result of pointing at
    /// an already-extracted tree.
    #[error("{} is a directory, not an archive; was it already extracted?", .path.display())]
    NotAnArchive { path: PathBuf },

    /// The extraction handler failed. `staging` is kept when it holds
    /// partially extracted entries.
    #[error("extracting {} failed: {detail}", .archive.display())]
    Extraction {
        archive: PathBuf,
        detail: String,
        staging: Option<PathBuf>,
    },

    /// On-disk state only explainable as a bug or a concurrent writer.
    #[error("internal consistency error: {0}")]
    InternalConsistency(String),

    /// Any other filesystem failure, with the operation spelled out.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub(crate) fn config(reason: impl Into<String>) -> Self {
        Error::Configuration(reason.into())
    }

    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            context: context.into(),
            source,
        }
    }

    /// The surviving staged path to inspect after this failure, if any.
    #[must_use]
    pub fn kept_path(&self) -> Option<&Path> {
        match self {
            Error::Transport { partial, .. } => partial.as_deref(),
            Error::Integrity { archive, .. } => Some(archive),
            Error::Extraction { staging, .. } => staging.as_deref(),
            _ => None,
        }
    }

    /// Whether this is a bad invocation rather than an environment or
    /// pipeline fault. Exit codes key off this.
    #[must_use]
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            Error::Configuration(_)
                | Error::UnsupportedFormat { .. }
                | Error::NotFound { .. }
                | Error::NotAnArchive { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_errors_cover_the_input_taxonomy() {
        assert!(Error::config("bad flags").is_usage());
        assert!(Error::UnsupportedFormat {
            name: "notes.txt".into()
        }
        .is_usage());
        assert!(Error::NotFound {
            path: PathBuf::from("/missing")
        }
        .is_usage());
        assert!(!Error::InternalConsistency("dirty staging".into()).is_usage());
        assert!(!Error::Transport {
            origin: "https://example.org/a.tar.gz".into(),
            detail: "connection refused".into(),
            partial: None,
        }
        .is_usage());
    }

    #[test]
    fn kept_path_surfaces_the_staged_artifact() {
        let err = Error::Integrity {
            archive: PathBuf::from("/stage/a.tar.gz"),
            detail: "exit status 2".into(),
        };
        assert_eq!(err.kept_path(), Some(Path::new("/stage/a.tar.gz")));

        let err = Error::Extraction {
            archive: PathBuf::from("/stage/a.tar.gz"),
            detail: "exit status 2".into(),
            staging: Some(PathBuf::from("/out/a-unpacked-x1y2z3")),
        };
        assert_eq!(err.kept_path(), Some(Path::new("/out/a-unpacked-x1y2z3")));

        assert_eq!(Error::config("nope").kept_path(), None);
    }
}
