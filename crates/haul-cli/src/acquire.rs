use std::path::PathBuf;

use atty::Stream;
use clap::{value_parser, ArgAction, Parser};
use color_eyre::Result;
use haul_core::{AcquireOutcome, AcquireRequest, UnpackDisposition};

mod common;
mod style;

use common::CommandStatus;
use style::Style;

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = AcquireCli::parse();
    common::init_tracing(cli.trace, cli.verbose);

    let request = AcquireRequest {
        source: cli.url.clone(),
        destination_dir: cli.destination_dir.clone(),
        unpack_to: cli.unpack_to_new_dir.clone(),
        remove_first_level: cli.remove_first_level,
        test_with_full_extraction: cli.test_with_full_extraction,
    };

    match haul_core::acquire(&request) {
        Ok(outcome) => {
            if !cli.quiet {
                let style = Style::new(cli.no_color, atty::is(Stream::Stdout));
                println!("{}", style.status(&CommandStatus::Ok, &describe(&outcome)));
            }
            Ok(())
        }
        Err(err) => {
            let code = common::report_failure(cli.no_color, &err);
            std::process::exit(code);
        }
    }
}

fn describe(outcome: &AcquireOutcome) -> String {
    let archive = outcome.archive.display();
    match (&outcome.unpacked, outcome.downloaded) {
        (None, true) => format!("fetched {archive}"),
        (None, false) => format!("{archive} already present"),
        (Some(UnpackDisposition::Promoted(dir)), true) => {
            format!("fetched {archive} and unpacked to {}", dir.display())
        }
        (Some(UnpackDisposition::Promoted(dir)), false) => {
            format!("unpacked cached {archive} to {}", dir.display())
        }
        (Some(UnpackDisposition::AlreadyPresent(dir)), _) => {
            format!("{archive} already present and unpacked at {}", dir.display())
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Download an archive, verify it, and commit it atomically",
    long_about = "Fetches an archive into a staging directory next to its final location, \
checks its integrity, and only then moves it into place. Re-running the same \
acquisition is a no-op once the archive is committed.",
    after_help = "Examples:\n  acquire https://example.org/pkg-2.1.tar.gz /tmp/dl\n  acquire --unpack-to-new-dir=/tmp/src/pkg-2.1 https://example.org/pkg-2.1.tar.gz /tmp/dl\n  acquire --test-with-full-extraction https://example.org/pkg-2.1.tar.gz /tmp/dl"
)]
struct AcquireCli {
    #[arg(
        short,
        long,
        help = "Suppress human output (errors still print to stderr)"
    )]
    quiet: bool,
    #[arg(short, long, action = ArgAction::Count, help = "Increase logging (-vv reaches trace)")]
    verbose: u8,
    #[arg(long, help = "Force trace logging regardless of -v/-q")]
    trace: bool,
    #[arg(long, help = "Disable colored human output")]
    no_color: bool,
    #[arg(
        long,
        value_name = "DIR",
        value_parser = value_parser!(PathBuf),
        conflicts_with = "test_with_full_extraction",
        help = "After verifying, also unpack the archive and promote it to DIR"
    )]
    unpack_to_new_dir: Option<PathBuf>,
    #[arg(
        long,
        requires = "unpack_to_new_dir",
        help = "Strip the archive's single top-level directory when promoting"
    )]
    remove_first_level: bool,
    #[arg(
        long,
        help = "Verify by extracting everything to a scratch directory instead of streaming to a sink"
    )]
    test_with_full_extraction: bool,
    #[arg(value_name = "URL", help = "Archive URL (http, https, file) or local path")]
    url: String,
    #[arg(
        value_name = "DEST_DIR",
        value_parser = value_parser!(PathBuf),
        help = "Existing directory that receives the committed archive"
    )]
    destination_dir: PathBuf,
}
