#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;

pub fn write_tar_gz(dest: &Path, entries: &[(&str, &str)]) {
    let file = File::create(dest).expect("create archive");
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (name, content) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, name, content.as_bytes())
            .expect("append entry");
    }
    builder
        .into_inner()
        .expect("finish tar")
        .finish()
        .expect("finish gzip");
}

/// A tarball whose end-of-archive marker is replaced with garbage: its
/// entries extract, then the extraction fails.
pub fn write_truncated_tar_gz(dest: &Path, entries: &[(&str, &str)]) {
    let mut tar = Vec::new();
    {
        let mut builder = tar::Builder::new(&mut tar);
        for (name, content) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, name, content.as_bytes())
                .expect("append entry");
        }
        builder.finish().expect("finish tar");
    }
    tar.truncate(tar.len() - 1024);
    let garbled = tar.len() + 512;
    tar.resize(garbled, 0xFF);
    let file = File::create(dest).expect("create archive");
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder.write_all(&tar).expect("write tar");
    encoder.finish().expect("finish gzip");
}

pub fn write_gz(dest: &Path, content: &[u8]) {
    let file = File::create(dest).expect("create archive");
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder.write_all(content).expect("write content");
    encoder.finish().expect("finish gzip");
}

pub fn write_zip(dest: &Path, entries: &[(&str, &str)]) {
    let mut writer = zip::ZipWriter::new(File::create(dest).expect("create archive"));
    let options = zip::write::FileOptions::default();
    for (name, content) in entries {
        writer.start_file(*name, options).expect("start entry");
        writer.write_all(content.as_bytes()).expect("write entry");
    }
    writer.finish().expect("finish zip");
}

pub fn tool_available(name: &str) -> bool {
    which::which(name).is_ok()
}

/// Path argument as a `&str`, for `args([...])` slices.
pub fn arg(path: &Path) -> &str {
    path.to_str().expect("utf-8 path")
}
