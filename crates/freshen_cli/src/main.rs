//! Freshen CLI: warms, queries, and inspects file change snapshots.
//!
//! Provides `freshen build` to scan a project and write a snapshot,
//! `freshen check` to look individual files up against it, and
//! `freshen inspect` to list what a snapshot holds.

#![warn(missing_docs)]

mod build;
mod check;
mod inspect;
mod pipeline;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

/// Freshen, a persistent, content-aware file change cache.
#[derive(Parser, Debug)]
#[command(name = "freshen", version, about = "Freshen file change cache")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a custom `freshen.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan a directory and write a snapshot of every matching file.
    Build(BuildArgs),
    /// Look files up against the project snapshot.
    Check(CheckArgs),
    /// List the entries of a snapshot.
    Inspect(InspectArgs),
}

/// Arguments for the `freshen build` subcommand.
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Directory to scan (default: the project root).
    pub dir: Option<PathBuf>,

    /// Snapshot output path (default: `cache.snapshot` from `freshen.toml`).
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Ignore any existing snapshot and rehash every file.
    #[arg(long)]
    pub clean: bool,
}

/// Arguments for the `freshen check` subcommand.
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Files to look up.
    #[arg(required = true, num_args = 1..)]
    pub files: Vec<PathBuf>,

    /// Only answer from the snapshot; unknown files are errors.
    #[arg(long)]
    pub strict: bool,

    /// Snapshot to load (default: `cache.snapshot` from `freshen.toml`).
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    /// Write recomputed entries back to the snapshot.
    #[arg(long)]
    pub update: bool,

    /// Print results as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `freshen inspect` subcommand.
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Snapshot to list (default: `cache.snapshot` from `freshen.toml`).
    pub snapshot: Option<PathBuf>,

    /// Print entries as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config: cli.config,
    };

    let result = match cli.command {
        Command::Build(ref args) => build::run(args, &global),
        Command::Check(ref args) => check::run(args, &global),
        Command::Inspect(ref args) => inspect::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Installs the global `tracing` subscriber on stderr.
///
/// `RUST_LOG` takes precedence over the level picked from the flags.
fn init_tracing(verbose: bool, quiet: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level(verbose, quiet)));

    // A subscriber may already be installed when embedded; keep the existing one.
    let _ = fmt()
        .compact()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Picks the default log level from the verbosity flags.
fn log_level(verbose: bool, quiet: bool) -> &'static str {
    if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    }
}
