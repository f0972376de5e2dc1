//! CLI commands

mod completion;
mod init;
mod run;

pub use completion::CompletionCommand;
pub use init::InitCommand;
pub use run::RunCommand;

use clap::{Parser, Subcommand, ValueEnum};

/// Querybridge - asynchronous query execution over heterogeneous data sources
#[derive(Parser, Debug)]
#[command(name = "querybridge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    ///
    /// Global so it can follow the subcommand, e.g. `querybridge run -f bridge.yaml`.
    #[arg(
        short = 'f',
        long = "file",
        global = true,
        default_value = "querybridge.yaml"
    )]
    pub config: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Log line rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the Querybridge server
    Run(RunCommand),

    /// Write a sample configuration and .env.example
    Init(InitCommand),

    /// Generate shell completions
    #[command(hide = true)]
    Completion(CompletionCommand),
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn config_path(&self) -> &str {
        &self.config
    }
}
