#![forbid(unsafe_code)]

mod cmd;
mod output;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use output::{OutputMode, resolve_output_mode};
use std::env;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "inherit: emit changed files together with the files that include them",
    long_about = None
)]
struct Cli {
    /// Log engine internals at debug level (unless INHERIT_LOG is set).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        resolve_output_mode(self.json)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Run one batch of files and print what should be rebuilt",
        long_about = "Read the given files, record which files they include, and print \
                      the files that need rebuilding: changed files nothing includes, \
                      plus every file that includes a changed file.",
        after_help = "EXAMPLES:\n    # Which stylesheets depend on a changed partial?\n    \
                      inherit run --pattern '(?m)^@import\\s+\"([^\"]+)\"' src/*.scss\n\n    \
                      # Emit every changed file as well, as JSON\n    \
                      inherit run --include-all --json src/*.scss"
    )]
    Run(cmd::run::RunArgs),

    #[command(
        about = "Process batches read line by line from stdin",
        long_about = "Keep the dependency graph across batches. Each stdin line is one \
                      batch of whitespace-separated paths. A `:reset` line forgets \
                      everything learned so far.",
        after_help = "EXAMPLES:\n    # Feed batches from a file watcher\n    \
                      watcher | inherit session --json\n\n    \
                      # Use the pattern from .inherit.toml\n    \
                      printf 'a.pug b.pug\\n:reset\\n' | inherit session"
    )]
    Session(cmd::session::SessionArgs),
}

/// Filter used when `INHERIT_LOG` is unset.
const fn default_filter(verbose: bool, debug_env: bool) -> &'static str {
    if verbose || debug_env {
        "inherit=debug,info"
    } else {
        "inherit=info,warn"
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("INHERIT_LOG").unwrap_or_else(|_| {
        EnvFilter::new(default_filter(verbose, env::var("DEBUG").is_ok()))
    });

    let format = env::var("INHERIT_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    // stdout carries results, so logs go to stderr.
    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let project_root = env::current_dir().context("failed to resolve working directory")?;
    let output = cli.output_mode();
    debug!(json = output.is_json(), root = %project_root.display(), "starting");

    match cli.command {
        Commands::Run(ref args) => cmd::run::run_run(args, output, &project_root),
        Commands::Session(ref args) => cmd::session::run_session(args, output, &project_root),
    }
}
