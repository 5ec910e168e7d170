mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::allocate::AllocateArgs;
use commands::classify::ClassifyArgs;
use commands::universe::UniverseArgs;

/// Environment variable holding the log filter (e.g. "debug", "equity_allocator_core=trace").
const LOG_ENV: &str = "EQALLOC_LOG";

/// Discrete equity portfolio allocation
#[derive(Parser)]
#[command(
    name = "eqalloc",
    version,
    about = "Discrete equity portfolio allocation",
    long_about = "Turns a cash amount into whole-share purchases across a ranked equity \
                  universe using minimum-variance, maximum-Sharpe or risk-parity weights, \
                  with decimal precision. Reports return, risk, Sharpe, VaR, projected \
                  value and sector exposure."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute weights and a whole-share allocation for an investment amount
    Allocate(AllocateArgs),
    /// Classify an investor as Aggressive, Moderate or Conservative
    Classify(ClassifyArgs),
    /// Show the instrument universe a provider delivers
    Universe(UniverseArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_logging();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Allocate(args) => commands::allocate::run_allocate(args),
        Commands::Classify(args) => commands::classify::run_classify(args),
        Commands::Universe(args) => commands::universe::run_universe(args),
        Commands::Version => {
            println!("eqalloc {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
