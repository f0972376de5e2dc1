//! Querybridge CLI
//!
//! Command-line interface for the Querybridge execution service.

use clap::Parser;
use querybridge_cli::{Cli, Commands, LogFormat};
use querybridge_core::QueryError;
use querybridge_parser::parse_file;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Map the configured `log_level` (0=DEBUG .. 3=ERROR) to a tracing level
fn config_level(log_level: u8) -> Level {
    match log_level {
        0 => Level::DEBUG,
        1 => Level::INFO,
        2 => Level::WARN,
        _ => Level::ERROR,
    }
}

fn init_logging(cli: &Cli, configured: Option<u8>) {
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        configured.map(config_level).unwrap_or(Level::INFO)
    };
    let filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();

    match cli.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init(),
    }
}

async fn run() -> Result<(), QueryError> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Run(cmd) => {
            let config = parse_file(cli.config_path())?;
            init_logging(&cli, Some(config.log_level()));
            tracing::info!("Loaded configuration from: {}", cli.config_path());
            cmd.execute(config).await?;
        }
        Commands::Init(cmd) => {
            init_logging(&cli, None);
            cmd.execute().await?;
        }
        Commands::Completion(cmd) => {
            cmd.execute();
        }
    }

    Ok(())
}
