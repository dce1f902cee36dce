#![deny(clippy::all, warnings)]

//! Crash-safe acquisition and unpacking of archives.
//!
//! The two entry points mirror the two command-line tools: [`acquire`]
//! downloads an archive into a staging directory, verifies it, and commits
//! it atomically, optionally deriving an unpacked directory from it;
//! [`unpack`] extracts any local archive through the same staged-promotion
//! protocol. Neither ever exposes a partial result under a final name.

mod core;

pub use crate::core::acquire::{acquire, AcquireOutcome, AcquireRequest, UnpackDisposition};
pub use crate::core::artifact::{parse as parse_artifact, Artifact, Source};
pub use crate::core::config::Tool;
pub use crate::core::dispatch::{resolve as resolve_format, Dispatch, HandlerKind, StreamCodec};
pub use crate::core::error::{Error, Result};
pub use crate::core::unpack::{unpack, Promotion, Unpacked, UnpackRequest};
