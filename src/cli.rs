//! Interfaz de línea de comandos sobre el orquestador.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

use scrubmeta::config::load_options;
use scrubmeta::report::{export_report, styled_line, styled_summary};
use scrubmeta::{BatchOrchestrator, ResultKind, ScrubOptions};

#[derive(Parser, Debug)]
#[command(name = "scrubmeta")]
#[command(version)]
#[command(about = "Remove identifying metadata from images, PDFs, Office documents and media", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only print errors and the final summary
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write metadata-free copies of a file or directory into an output directory
    Scrub(ScrubArgs),
}

#[derive(Args, Debug)]
pub struct ScrubArgs {
    /// File or directory to scrub
    pub input: PathBuf,

    /// Directory for the cleaned copies
    #[arg(short, long = "out", value_name = "DIR")]
    pub out: PathBuf,

    /// Descend into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Show what would be written without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Replace existing outputs instead of adding _clean_N suffixes
    #[arg(long)]
    pub overwrite: bool,

    /// Mirror the input directory layout under the output directory
    #[arg(long)]
    pub keep_structure: bool,

    /// ffmpeg binary used for audio and video files
    #[arg(long, env = "SCRUBMETA_FFMPEG", value_name = "PATH")]
    pub ffmpeg_path: Option<PathBuf>,

    /// Maximum seconds an external tool may run per file
    #[arg(long, value_name = "SECS")]
    pub tool_timeout: Option<u64>,

    /// TOML file with default options
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Export the batch report (.json or .csv)
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,
}

impl ScrubArgs {
    /// Opciones del archivo de configuración con las banderas aplicadas encima.
    pub fn options(&self) -> Result<ScrubOptions> {
        let mut options = match &self.config {
            Some(path) => load_options(path)?,
            None => ScrubOptions::default(),
        };

        options.recursive |= self.recursive;
        options.dry_run |= self.dry_run;
        options.overwrite |= self.overwrite;
        options.keep_structure |= self.keep_structure;
        if let Some(path) = &self.ffmpeg_path {
            options.external_tool_path = Some(path.clone());
        }
        if let Some(seconds) = self.tool_timeout {
            options.tool_timeout_secs = seconds;
        }

        Ok(options)
    }
}

impl Cli {
    /// Devuelve `false` si algún archivo terminó en error.
    pub fn run(self) -> Result<bool> {
        match self.command {
            Commands::Scrub(args) => scrub(args, self.quiet),
        }
    }
}

fn scrub(args: ScrubArgs, quiet: bool) -> Result<bool> {
    let options = args.options()?;
    let orchestrator = BatchOrchestrator::new();

    let outcome = orchestrator.run(&args.input, &args.out, &options, |record| {
        if !quiet || record.kind() == ResultKind::Error {
            println!("{}", styled_line(record));
        }
    });

    if outcome.summary.scanned == 0 {
        println!(
            "{}",
            style(format!("No files found in: {}", args.input.display())).yellow()
        );
    }

    println!("\n{}", styled_summary(&outcome.summary));

    if let Some(path) = &args.report {
        export_report(&outcome, path)
            .with_context(|| format!("could not export report to {}", path.display()))?;
        if !quiet {
            println!("{}", style(format!("Report written to {}", path.display())).dim());
        }
    }

    Ok(!outcome.summary.has_errors())
}

/// Registro en stderr; `RUST_LOG` tiene prioridad sobre `-v`.
pub fn setup_logging(verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match (quiet, verbose) {
            (true, _) => "error",
            (false, 0) => "warn",
            (false, 1) => "info",
            (false, 2) => "debug",
            (false, _) => "trace",
        })
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
