use atty::Stream;

use crate::style::Style;

pub enum CommandStatus {
    Ok,
    UserError,
    Failure,
}

pub fn exit_code(status: &CommandStatus) -> i32 {
    match status {
        CommandStatus::Ok => 0,
        CommandStatus::UserError => 1,
        CommandStatus::Failure => 2,
    }
}

pub fn init_tracing(trace: bool, verbose: u8) {
    let level = if trace {
        "trace"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = format!("haul_core={level},acquire={level},unpack={level}");
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Print a failure to stderr and return the exit code to use. Errors that
/// kept a staged path on disk also print a hint naming it.
pub fn report_failure(force_no_color: bool, err: &haul_core::Error) -> i32 {
    let status = if err.is_usage() {
        CommandStatus::UserError
    } else {
        CommandStatus::Failure
    };
    let style = Style::new(force_no_color, atty::is(Stream::Stderr));
    eprintln!("{}", style.status(&status, &err.to_string()));
    if let Some(path) = err.kept_path() {
        let hint = format!("Hint: inspect {}", path.display());
        eprintln!("{}", style.info(&hint));
    }
    exit_code(&status)
}
