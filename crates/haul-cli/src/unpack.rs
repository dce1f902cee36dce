use std::path::PathBuf;

use atty::Stream;
use clap::{value_parser, ArgAction, Parser};
use color_eyre::Result;
use haul_core::{Promotion, Unpacked, UnpackRequest};

mod common;
mod style;

use common::CommandStatus;
use style::Style;

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = UnpackCli::parse();
    common::init_tracing(cli.trace, cli.verbose);

    let request = UnpackRequest {
        archive: cli.archive.clone(),
        output_dir: cli.output_dir.clone(),
    };

    match haul_core::unpack(&request) {
        Ok(unpacked) => {
            if !cli.quiet {
                emit(&cli, &unpacked);
            }
            Ok(())
        }
        Err(err) => {
            let code = common::report_failure(cli.no_color, &err);
            std::process::exit(code);
        }
    }
}

fn emit(cli: &UnpackCli, unpacked: &Unpacked) {
    let style = Style::new(cli.no_color, atty::is(Stream::Stdout));
    let archive = unpacked.archive.display();
    match &unpacked.promotion {
        Promotion::Promoted(path) => {
            let line = format!("unpacked {archive} to {}", path.display());
            println!("{}", style.status(&CommandStatus::Ok, &line));
        }
        Promotion::LeftInStaging { staging, occupied } => {
            let line = format!("unpacked {archive}");
            println!("{}", style.status(&CommandStatus::Ok, &line));
            let note = format!(
                "{} already exists; the extracted content is in {}",
                occupied.display(),
                staging.display()
            );
            println!("{}", style.info(&note));
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Extract a local archive through a staging directory",
    long_about = "Extracts any supported archive into a uniquely named staging directory \
inside the output directory, then renames the result to its final name. An \
archive with a single top-level entry keeps that entry's own name; anything \
else lands under the archive's stem. Existing paths are never overwritten.",
    after_help = "Examples:\n  unpack pkg-1.0.tar.gz\n  unpack ~/downloads/site.zip /srv/www\n  unpack notes.txt.gz"
)]
struct UnpackCli {
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
        value_name = "ARCHIVE",
        value_parser = value_parser!(PathBuf),
        help = "Archive file to extract"
    )]
    archive: PathBuf,
    #[arg(
        value_name = "OUTPUT_DIR",
        value_parser = value_parser!(PathBuf),
        default_value = ".",
        help = "Directory that receives the result"
    )]
    output_dir: PathBuf,
}
