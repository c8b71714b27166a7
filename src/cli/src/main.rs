//! Soldexer CLI entry point.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use soldexer_cli::commands::{dispatch, Cli};
use soldexer_cli::output;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .init();

    if let Err(e) = dispatch(cli).await {
        eprintln!("{}", output::error_report(&e));
        std::process::exit(e.exit_code());
    }
}
