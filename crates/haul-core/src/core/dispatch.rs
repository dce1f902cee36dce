//! Maps archive file names to handlers by suffix.
//!
//! Resolution is case-insensitive and always prefers the longest matching
//! suffix, so `pkg-1.0.tar.gz` goes to the tar handler while `data.gz` goes
//! to the raw gzip stream handler. Table order never decides a tie.

/// How a matched archive is serviced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    /// The tar family. Compression is detected by the tar tool on extract.
    Tar,
    /// Zip archives, including jars.
    Zip,
    /// 7-Zip archives and ISO images.
    SevenZip,
    /// A single compressed file, not a container.
    Stream(StreamCodec),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamCodec {
    Gzip,
    Xz,
    /// LZW `.Z`; serviced by the gzip tool, which reads compress output.
    Compress,
}

/// Suffixes are stored lowercase; matching lowercases the candidate name.
const TABLE: &[(&str, HandlerKind)] = &[
    (".tar", HandlerKind::Tar),
    (".tar.gz", HandlerKind::Tar),
    (".tgz", HandlerKind::Tar),
    (".tar.bz2", HandlerKind::Tar),
    (".tar.xz", HandlerKind::Tar),
    (".tar.lzma", HandlerKind::Tar),
    (".tar.lz", HandlerKind::Tar),
    (".tar.z", HandlerKind::Tar),
    (".zip", HandlerKind::Zip),
    (".jar", HandlerKind::Zip),
    (".7z", HandlerKind::SevenZip),
    (".iso", HandlerKind::SevenZip),
    (".gz", HandlerKind::Stream(StreamCodec::Gzip)),
    (".xz", HandlerKind::Stream(StreamCodec::Xz)),
    (".z", HandlerKind::Stream(StreamCodec::Compress)),
];

/// A resolved dispatch decision for one file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub kind: HandlerKind,
    /// The table suffix that matched, in its lowercase form.
    pub suffix: &'static str,
    /// The file name with the matched suffix stripped, original casing
    /// preserved. Falls back to the whole name when stripping would leave
    /// nothing.
    pub stem: String,
}

/// Resolve a file name against the table. `None` means no suffix matched.
#[must_use]
pub fn resolve(file_name: &str) -> Option<Dispatch> {
    let lowered = file_name.to_ascii_lowercase();
    let mut best: Option<(&'static str, HandlerKind)> = None;
    for &(suffix, kind) in TABLE {
        if !lowered.ends_with(suffix) {
            continue;
        }
        match best {
            Some((held, _)) if held.len() >= suffix.len() => {}
            _ => best = Some((suffix, kind)),
        }
    }
    let (suffix, kind) = best?;
    // The matched tail is ASCII, so byte-length stripping is safe.
    let stripped = &file_name[..file_name.len() - suffix.len()];
    let stem = if stripped.is_empty() {
        file_name.to_string()
    } else {
        stripped.to_string()
    };
    Some(Dispatch { kind, suffix, stem })
}
