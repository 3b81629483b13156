use clap::Parser;
use tracing_subscriber::EnvFilter;

use cidchain_cli::config::LOG_ENV;
use cidchain_cli::Cli;

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = cidchain_cli::run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
