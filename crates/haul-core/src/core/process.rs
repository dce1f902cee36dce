use std::ffi::OsString;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;

use tracing::info;

use crate::core::error::{Error, Result};

const DEFAULT_MAX_CAPTURE_BYTES: usize = 1024 * 1024;

fn max_capture_bytes() -> usize {
    std::env::var("HAUL_MAX_CAPTURE_BYTES")
        .ok()
        .and_then(|raw| raw.trim().parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_MAX_CAPTURE_BYTES)
}

/// Where a tool's stdout goes.
pub enum StdoutTo {
    /// Discard it. Used for verify runs that stream an archive to a sink.
    Null,
    /// Capture it, bounded, for diagnostics.
    Capture,
    /// Redirect it into a file, for stream decompression.
    File(File),
}

#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Run an external tool with an argument array, never through a shell.
///
/// The exact command line is echoed before the spawn so a failed transcript
/// shows what ran. Stderr is always captured with a byte cap that keeps the
/// tail; stdout follows `stdout`.
///
/// # Errors
///
/// Returns an error when the tool cannot be spawned or its streams cannot be
/// read. A nonzero exit is not an error here; callers decide what it means.
pub fn run_tool(
    program: &Path,
    args: &[OsString],
    cwd: &Path,
    stdout: StdoutTo,
) -> Result<ToolOutput> {
    info!(command = %render_command(program, args), cwd = %cwd.display(), "running");

    let mut command = Command::new(program);
    command.args(args);
    command.current_dir(cwd);
    command.stdin(Stdio::null());
    command.stderr(Stdio::piped());
    let capture_stdout = match stdout {
        StdoutTo::Null => {
            command.stdout(Stdio::null());
            false
        }
        StdoutTo::Capture => {
            command.stdout(Stdio::piped());
            true
        }
        StdoutTo::File(file) => {
            command.stdout(Stdio::from(file));
            false
        }
    };

    let mut child = command
        .spawn()
        .map_err(|err| Error::io(format!("failed to start {}", program.display()), err))?;

    let limit = max_capture_bytes();
    let stdout_handle = if capture_stdout {
        let stream = child.stdout.take().ok_or_else(|| {
            Error::InternalConsistency(format!("stdout missing for {}", program.display()))
        })?;
        Some(thread::spawn(move || read_to_string_limited(stream, limit)))
    } else {
        None
    };
    let stderr_stream = child.stderr.take().ok_or_else(|| {
        Error::InternalConsistency(format!("stderr missing for {}", program.display()))
    })?;
    let stderr_handle = thread::spawn(move || read_to_string_limited(stderr_stream, limit));

    let status = child
        .wait()
        .map_err(|err| Error::io(format!("failed to wait for {}", program.display()), err))?;
    let code = status.code().unwrap_or(-1);

    let stdout_text = match stdout_handle {
        Some(handle) => finish_capture(handle, program)?,
        None => String::new(),
    };
    let stderr_text = finish_capture(stderr_handle, program)?;

    Ok(ToolOutput {
        code,
        stdout: stdout_text,
        stderr: stderr_text,
    })
}

type CaptureHandle = thread::JoinHandle<io::Result<(String, bool)>>;

fn finish_capture(handle: CaptureHandle, program: &Path) -> Result<String> {
    let (mut text, truncated) = handle
        .join()
        .map_err(|_| {
            Error::InternalConsistency(format!("reader thread for {} panicked", program.display()))
        })?
        .map_err(|err| Error::io(format!("reading output of {}", program.display()), err))?;
    if truncated {
        text.push_str("\n[...truncated...]\n");
    }
    Ok(text)
}

fn render_command(program: &Path, args: &[OsString]) -> String {
    let mut rendered = quote_component(&program.to_string_lossy());
    for arg in args {
        rendered.push(' ');
        rendered.push_str(&quote_component(&arg.to_string_lossy()));
    }
    rendered
}

fn quote_component(component: &str) -> String {
    let plain = !component.is_empty()
        && component
            .chars()
            .all(|ch| !ch.is_whitespace() && !matches!(ch, '\'' | '"' | '$' | '\\'));
    if plain {
        component.to_string()
    } else {
        format!("'{}'", component.replace('\'', "'\\''"))
    }
}

fn read_to_string_limited(mut reader: impl Read, limit: usize) -> io::Result<(String, bool)> {
    let mut buffer = Vec::new();
    let mut truncated = false;
    let mut chunk = [0u8; 8192];
    loop {
        let read = reader.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        append_limited(&mut buffer, &chunk[..read], limit, &mut truncated);
    }
    Ok((String::from_utf8_lossy(&buffer).to_string(), truncated))
}

// Keeps the tail when over the limit: the end of a failing tool's output is
// where the diagnosis lives.
fn append_limited(buffer: &mut Vec<u8>, chunk: &[u8], limit: usize, truncated: &mut bool) {
    if limit == 0 {
        return;
    }
    if buffer.len().saturating_add(chunk.len()) <= limit {
        buffer.extend_from_slice(chunk);
        return;
    }
    *truncated = true;
    let old_len = buffer.len();
    let excess = old_len.saturating_add(chunk.len()).saturating_sub(limit);
    if excess >= old_len {
        buffer.clear();
        let drop_from_chunk = excess.saturating_sub(old_len).min(chunk.len());
        buffer.extend_from_slice(&chunk[drop_from_chunk..]);
    } else {
        buffer.drain(0..excess);
        buffer.extend_from_slice(chunk);
    }
}
