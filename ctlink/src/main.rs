//! `ctlink` - a command-line driver for the CTF link engine.
//!
//! Parses arguments, initializes logging, loads configuration, and
//! dispatches to the `link`/`inspect` subcommands.

mod commands;
mod config;
mod descriptor;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{
    inspect::{run_inspect, InspectArgs},
    link::{run_link, LinkArgs},
};
use config::Config;
use error::{CliError, Result};

/// ctlink - link CTF debug info across compilation units.
#[derive(Parser, Debug)]
#[command(name = "ctlink")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Merge CTF type and variable information from multiple compilation units into one archive", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[arg(short, long, global = true, env = "CTLINK_VERBOSE")]
    verbose: bool,

    #[arg(short, long, global = true, env = "CTLINK_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, global = true, env = "CTLINK_NO_COLOR")]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Link one or more described input archives into a shared/per-CU archive.
    Link(LinkCommandArgs),
    /// Print the member list of a previously emitted archive.
    Inspect(InspectCommandArgs),
}

#[derive(Parser, Debug)]
struct LinkCommandArgs {
    /// Path to a JSON link request (see `descriptor::LinkRequest`).
    request: PathBuf,

    /// Output path for the emitted archive (default: from config).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Conflict-resolution mode: `unconflicted` (default) or `duplicated`.
    #[arg(long)]
    share_mode: Option<String>,
}

#[derive(Parser, Debug)]
struct InspectCommandArgs {
    /// Path to a previously emitted archive.
    archive: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.no_color)?;
    let config = load_config(cli.config.as_deref())?;

    execute_command(cli.command, cli.verbose, config)
}

fn init_logging(verbose: bool, no_color: bool) -> Result<()> {
    let filter = if verbose { EnvFilter::new("debug") } else { EnvFilter::new("info") };

    let subscriber = fmt::layer().with_ansi(!no_color).with_target(false).with_thread_ids(false).with_thread_names(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(subscriber)
        .try_init()
        .map_err(|e| CliError::Config(format!("failed to initialize logging: {e}")))?;

    Ok(())
}

fn load_config(config_path: Option<&std::path::Path>) -> Result<Config> {
    match config_path {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    }
}

fn execute_command(command: Commands, verbose: bool, config: Config) -> Result<()> {
    match command {
        Commands::Link(args) => execute_link(args, verbose, config),
        Commands::Inspect(args) => execute_inspect(args),
    }
}

fn execute_link(args: LinkCommandArgs, verbose: bool, config: Config) -> Result<()> {
    let link_args = LinkArgs { request: args.request, output: args.output, share_mode: args.share_mode, verbose };
    run_link(link_args, config)?;
    Ok(())
}

fn execute_inspect(args: InspectCommandArgs) -> Result<()> {
    run_inspect(InspectArgs { archive: args.archive })
}
