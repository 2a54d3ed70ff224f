mod catalog;
mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "HREFS_LOG";

/// Command-line interface.
#[derive(Parser)]
#[command(name = "hrefs", about = "Resolve typed hyperlinks against a routing table")]
struct Cli {
    /// Command to run.
    #[command(subcommand)]
    command: Commands,
    /// Path to the routing config
    #[arg(long, global = true, default_value = hrefs::config::CONFIG_FILE)]
    config: PathBuf,
}

/// Subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Build a hyperlink to a target from a key or URL
    Resolve {
        /// Target name (Book, Page, Cover, Library)
        target: String,
        /// Key (JSON) or absolute URL
        value: String,
    },
    /// List endpoints with their paths and parameters
    Routes,
    /// List targets with their key shapes and endpoints
    Targets,
}

/// Log to stderr, filtered by `HREFS_LOG` (default: warnings only).
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| return EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Resolve { target, value } => commands::cmd_resolve(&cli.config, target, value),
        Commands::Routes => commands::cmd_routes(&cli.config),
        Commands::Targets => commands::cmd_targets(&cli.config),
    };

    return match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        },
    };
}
