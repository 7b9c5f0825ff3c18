mod cli;
mod config;
mod identity;
mod lifecycle;
mod model;
mod projection;
mod storage;

use std::process;

use clap::Parser;

use cli::Cli;
use config::Config;

/// Environment variable holding a full tracing filter directive.
const LOG_ENV: &str = "KEFIR_LOG";

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose);

    let Some(root) = storage::default_root() else {
        eprintln!("Could not determine home directory.");
        process::exit(1);
    };

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            process::exit(1);
        }
    };

    let mode = config.deployment_mode(root);
    tracing::debug!(?mode, "deployment mode selected");

    if let Err(e) = cli::run(cli, config, &mode) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn init_tracing(quiet: bool, verbose: bool) {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    // Logs go to stderr so stdout stays clean for ids and listings.
    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
    {
        eprintln!("Failed to initialize logging: {e}");
    }
}
