#![forbid(unsafe_code)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

use bench_history::history_cmd;

#[derive(Parser, Debug)]
#[command(name = "bench-history")]
#[command(about = "Record benchmark runs and compare them against history", long_about = None)]
struct Cli {
    /// Enable verbose logging (or set BENCH_HISTORY_LOG)
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Append a run result to the history file
    Add {
        /// History document (created if missing)
        #[arg(long)]
        history: PathBuf,
        /// Run result JSON produced by the harness
        #[arg(long)]
        results: PathBuf,
        /// Label for the snapshot
        #[arg(long)]
        id: Option<String>,
        /// Snapshot date (RFC 3339); defaults to now
        #[arg(long)]
        date: Option<String>,
        /// History options (TOML)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Compute deltas of a run result against the history file
    Deltas {
        /// History document
        #[arg(long)]
        history: PathBuf,
        /// Run result JSON produced by the harness
        #[arg(long)]
        results: PathBuf,
        /// Metric key to compare (repeatable); defaults to measuredRunsAvgMs
        #[arg(long = "key")]
        keys: Vec<String>,
        /// History options (TOML)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Write the delta map as JSON to this file
        #[arg(long)]
        json: Option<PathBuf>,
        /// Write the delta map as CSV to this file
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Print the history document
    Show {
        #[arg(long)]
        history: PathBuf,
    },

    /// Check that a history document parses and is well-formed
    Validate {
        #[arg(long)]
        history: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let env = std::env::var("BENCH_HISTORY_LOG").unwrap_or_else(|_| {
        if verbose { "bench_history=debug".to_string() } else { "bench_history=info".to_string() }
    });
    let _ = tracing_subscriber::fmt()
        .with_span_events(FmtSpan::ACTIVE)
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_env_filter(EnvFilter::new(env))
        .try_init();
}

fn main() {
    color_eyre::install().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Add { history, results, id, date, config } => {
            history_cmd::add(history, results, id, date, config)
        }
        Commands::Deltas { history, results, keys, config, json, csv } => {
            history_cmd::deltas(history, results, keys, config, json, csv).map(|_| ())
        }
        Commands::Show { history } => history_cmd::show(history),
        Commands::Validate { history } => history_cmd::validate(history).map(|_| ()),
    };

    if let Err(e) = result {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}
