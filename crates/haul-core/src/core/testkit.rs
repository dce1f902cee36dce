//! Archive fixtures and environment probes shared by the unit tests.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;

/// A gzip-compressed tarball with the given `(path, content)` entries.
pub(crate) fn tar_gz_bytes(entries: &[(&str, &str)]) -> anyhow::Result<Vec<u8>> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (name, content) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, content.as_bytes())?;
    }
    Ok(builder.into_inner()?.finish()?)
}

pub(crate) fn write_tar_gz(dest: &Path, entries: &[(&str, &str)]) -> anyhow::Result<()> {
    std::fs::write(dest, tar_gz_bytes(entries)?)?;
    Ok(())
}

/// A tarball whose entries are intact but whose end-of-archive marker is
/// replaced with garbage, so extraction produces the entries and then
/// fails. The gzip layer itself stays valid.
pub(crate) fn write_truncated_tar_gz(dest: &Path, entries: &[(&str, &str)]) -> anyhow::Result<()> {
    let mut tar = Vec::new();
    {
        let mut builder = tar::Builder::new(&mut tar);
        for (name, content) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, content.as_bytes())?;
        }
        builder.finish()?;
    }
    // Drop the two terminating zero blocks and put an unreadable header in
    // their place.
    tar.truncate(tar.len() - 1024);
    let garbled = tar.len() + 512;
    tar.resize(garbled, 0xFF);
    let mut encoder = GzEncoder::new(File::create(dest)?, Compression::default());
    encoder.write_all(&tar)?;
    encoder.finish()?;
    Ok(())
}

/// A raw gzip stream holding `content`, no tar layer.
pub(crate) fn write_gz(dest: &Path, content: &[u8]) -> anyhow::Result<()> {
    let mut encoder = GzEncoder::new(File::create(dest)?, Compression::default());
    encoder.write_all(content)?;
    encoder.finish()?;
    Ok(())
}

pub(crate) fn write_zip(dest: &Path, entries: &[(&str, &str)]) -> anyhow::Result<()> {
    let mut writer = zip::ZipWriter::new(File::create(dest)?);
    let options = zip::write::FileOptions::default();
    for (name, content) in entries {
        writer.start_file(*name, options)?;
        writer.write_all(content.as_bytes())?;
    }
    writer.finish()?;
    Ok(())
}

pub(crate) fn tool_available(name: &str) -> bool {
    which::which(name).is_ok()
}

/// The first of `candidates` found on PATH.
pub(crate) fn first_available(candidates: &[&str]) -> Option<PathBuf> {
    candidates.iter().find_map(|name| which::which(name).ok())
}

/// A local test server, or `None` (with a skip notice) where binding a
/// loopback listener is not permitted.
pub(crate) fn http_server() -> Option<httptest::Server> {
    match std::panic::catch_unwind(httptest::Server::run) {
        Ok(server) => Some(server),
        Err(_) => {
            eprintln!("skipping: cannot bind a loopback listener in this environment");
            None
        }
    }
}
