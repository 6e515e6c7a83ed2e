use std::process::ExitCode;

use clap::Parser;
use filterfe::{cli, i18n, logger};

fn main() -> ExitCode {
    let args = cli::CliArgs::parse();

    // Initialize session log (overwrites previous session log)
    match &args.log_file {
        Some(path) => logger::init_at(path),
        None => logger::init(),
    }

    // Initialize the internationalization system
    i18n::init();

    cli::run(args)
}
