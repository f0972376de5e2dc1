//! Run command implementation

use clap::Args;
use querybridge_core::{Config, QueryError};
use querybridge_runtime::Runtime;
use tracing::info;

/// Run command arguments
#[derive(Args, Debug)]
pub struct RunCommand {
    /// Override server port
    #[arg(short, long)]
    pub port: Option<u16>,
}

impl RunCommand {
    /// Start the server with an already loaded configuration
    pub async fn execute(&self, config: Config) -> Result<(), QueryError> {
        info!(
            "Starting '{}' with {} storage",
            config.name, config.storage.backend
        );

        let runtime = Runtime::with_port_override(config, self.port).await?;
        runtime.run().await?;

        Ok(())
    }
}
