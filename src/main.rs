use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rootcause::cli::{self, LogFormat};
use rootcause::errors::RootCauseError;

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    match cli.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .with_current_span(false)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init(),
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        git_hash = option_env!("GIT_HASH").unwrap_or("unknown"),
        built = option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
        "rootcause starting"
    );

    if let Err(e) = cli::run::handle_run(cli).await {
        eprintln!("Error: {}", e);
        let exit_code = match &e {
            RootCauseError::Config(_) => 2,
            RootCauseError::InvalidInput(_) => 3,
            RootCauseError::Authentication(_) => 4,
            _ => 1,
        };
        std::process::exit(exit_code);
    }
}
