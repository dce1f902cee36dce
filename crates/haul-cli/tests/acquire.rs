use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;

mod common;

use common::arg;

#[test]
fn commits_a_local_archive_and_cleans_staging() {
    let temp = tempfile::tempdir().expect("tempdir");
    let source = temp.path().join("pkg-1.0.tar.gz");
    common::write_tar_gz(&source, &[("pkg-1.0/README", "hi")]);
    let dest = temp.path().join("dl");
    fs::create_dir(&dest).expect("dest dir");

    cargo_bin_cmd!("acquire")
        .args([arg(&source), arg(&dest)])
        .assert()
        .success();

    assert!(dest.join("pkg-1.0.tar.gz").is_file());
    assert!(
        !dest.join("pkg-1.0.tar.gz-download-in-progress").exists(),
        "staging must be gone after the commit"
    );
}

#[test]
fn second_run_is_a_no_op_without_the_source() {
    let temp = tempfile::tempdir().expect("tempdir");
    let source = temp.path().join("pkg-2.1.tar.gz");
    common::write_tar_gz(&source, &[("pkg-2.1/a", "a")]);
    let dest = temp.path().join("dl");
    fs::create_dir(&dest).expect("dest dir");
    let url = url::Url::from_file_path(&source).expect("absolute path");

    cargo_bin_cmd!("acquire")
        .args([url.as_str(), arg(&dest)])
        .assert()
        .success();

    // The archive is committed; the origin is no longer needed.
    fs::remove_file(&source).expect("remove source");
    let output = cargo_bin_cmd!("acquire")
        .args([url.as_str(), arg(&dest)])
        .output()
        .expect("run acquire");
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("already present"), "stdout: {stdout}");
    assert!(dest.join("pkg-2.1.tar.gz").is_file());
}

#[test]
fn unpacks_to_the_requested_directory() {
    let temp = tempfile::tempdir().expect("tempdir");
    let source = temp.path().join("widget-1.2.tar.gz");
    common::write_tar_gz(
        &source,
        &[("widget-1.2/Makefile", "all:"), ("widget-1.2/src/w.c", "")],
    );
    let dest = temp.path().join("dl");
    fs::create_dir(&dest).expect("dest dir");
    let tree = temp.path().join("widget-src");

    cargo_bin_cmd!("acquire")
        .arg(format!("--unpack-to-new-dir={}", tree.display()))
        .arg("--remove-first-level")
        .args([arg(&source), arg(&dest)])
        .assert()
        .success();

    assert!(dest.join("widget-1.2.tar.gz").is_file());
    assert!(
        tree.join("Makefile").is_file(),
        "remove-first-level must strip the top directory"
    );
    assert!(!tree.join("widget-1.2").exists());
}

#[test]
fn unpacks_a_cached_archive_without_its_source() {
    let temp = tempfile::tempdir().expect("tempdir");
    let dest = temp.path().join("dl");
    fs::create_dir(&dest).expect("dest dir");
    common::write_tar_gz(
        &dest.join("pkg-3.0.tar.gz"),
        &[("pkg-3.0/data", "cached bytes")],
    );
    let tree = temp.path().join("pkg-3.0-src");
    let missing_source = temp.path().join("nowhere/pkg-3.0.tar.gz");

    cargo_bin_cmd!("acquire")
        .arg(format!("--unpack-to-new-dir={}", tree.display()))
        .args([arg(&missing_source), arg(&dest)])
        .assert()
        .success();

    assert_eq!(
        fs::read_to_string(tree.join("pkg-3.0/data")).expect("promoted file"),
        "cached bytes"
    );
}

#[test]
fn conflicting_flags_are_rejected() {
    let temp = tempfile::tempdir().expect("tempdir");
    cargo_bin_cmd!("acquire")
        .arg(format!(
            "--unpack-to-new-dir={}",
            temp.path().join("out").display()
        ))
        .arg("--test-with-full-extraction")
        .args(["http://localhost/never.tar.gz", arg(temp.path())])
        .assert()
        .failure();

    cargo_bin_cmd!("acquire")
        .arg("--remove-first-level")
        .args(["http://localhost/never.tar.gz", arg(temp.path())])
        .assert()
        .failure();
}

#[test]
fn missing_destination_is_a_usage_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    let source = temp.path().join("pkg-4.0.tar.gz");
    common::write_tar_gz(&source, &[("pkg-4.0/a", "a")]);

    cargo_bin_cmd!("acquire")
        .args([arg(&source), arg(&temp.path().join("absent"))])
        .assert()
        .code(1);
}

#[test]
fn unsupported_format_is_a_usage_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    let source = temp.path().join("blob.bin");
    fs::write(&source, b"bytes").expect("source");
    let dest = temp.path().join("dl");
    fs::create_dir(&dest).expect("dest dir");

    let output = cargo_bin_cmd!("acquire")
        .args([arg(&source), arg(&dest)])
        .output()
        .expect("run acquire");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("unsupported archive format"),
        "stderr: {stderr}"
    );
}

#[test]
fn corrupt_download_fails_and_keeps_the_staged_file() {
    let temp = tempfile::tempdir().expect("tempdir");
    let source = temp.path().join("bad-1.0.tar.gz");
    fs::write(&source, b"these are not gzip bytes").expect("source");
    let dest = temp.path().join("dl");
    fs::create_dir(&dest).expect("dest dir");

    let output = cargo_bin_cmd!("acquire")
        .args([arg(&source), arg(&dest)])
        .output()
        .expect("run acquire");
    assert_eq!(output.status.code(), Some(2));
    let staged = dest
        .join("bad-1.0.tar.gz-download-in-progress")
        .join("bad-1.0.tar.gz");
    assert!(staged.is_file(), "staged file must stay for inspection");
    assert!(!dest.join("bad-1.0.tar.gz").exists());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Hint: inspect"), "stderr: {stderr}");
}

#[test]
fn quiet_suppresses_the_result_line() {
    let temp = tempfile::tempdir().expect("tempdir");
    let source = temp.path().join("pkg-5.0.tar.gz");
    common::write_tar_gz(&source, &[("pkg-5.0/a", "a")]);
    let dest = temp.path().join("dl");
    fs::create_dir(&dest).expect("dest dir");

    let output = cargo_bin_cmd!("acquire")
        .args(["--quiet", arg(&source), arg(&dest)])
        .output()
        .expect("run acquire");
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        !stdout.contains("fetched"),
        "no result line under --quiet: {stdout}"
    );
}
