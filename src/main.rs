mod cli;

use std::process::ExitCode;

use clap::Parser;
use console::style;

use crate::cli::{Cli, setup_logging};

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    match cli.run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(error) => {
            eprintln!("{} {error:#}", style("error:").red().bold());
            ExitCode::from(2)
        }
    }
}
