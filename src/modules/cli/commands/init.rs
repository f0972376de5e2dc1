//! Init command implementation

use clap::Args;
use querybridge_core::{QueryError, StorageBackend, DEFAULT_INLINE_THRESHOLD};
use std::fs;
use std::path::Path;
use tracing::info;

/// Init command arguments
#[derive(Args, Debug)]
pub struct InitCommand {
    /// Service name
    #[arg(default_value = "my-bridge")]
    pub name: String,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    pub output: String,

    /// Storage backend (mongodb or memory)
    #[arg(short = 's', long, default_value = "mongodb")]
    pub storage: StorageBackend,
}

impl InitCommand {
    /// Execute the init command
    pub async fn execute(&self) -> Result<(), QueryError> {
        info!("Initializing new Querybridge service: {}", self.name);

        let output_dir = Path::new(&self.output);
        if !output_dir.exists() {
            fs::create_dir_all(output_dir)?;
        }

        let config_path = output_dir.join("querybridge.yaml");
        if config_path.exists() {
            return Err(QueryError::Config(format!(
                "{} already exists",
                config_path.display()
            )));
        }
        fs::write(&config_path, self.generate_config())?;
        info!("Created: {}", config_path.display());

        let env_path = output_dir.join(".env.example");
        fs::write(&env_path, self.generate_env_example())?;
        info!("Created: {}", env_path.display());

        println!("\nQuerybridge service initialized!");
        println!("\nNext steps:");
        println!("  1. Copy .env.example to .env and update MONGO_URL");
        println!("  2. Run: querybridge run -f {}", config_path.display());
        println!("  3. Register a query: POST /query/new, then POST /execute");

        Ok(())
    }

    /// Generate configuration file content
    fn generate_config(&self) -> String {
        let storage = match self.storage {
            StorageBackend::Mongodb => r#"storage:
  backend: mongodb
  url: "{{ env.MONGO_URL }}"
  database: querybridge
  collection: queries
  bucket: query_output"#
                .to_string(),
            StorageBackend::Memory => "storage:\n  backend: memory".to_string(),
        };

        format!(
            r#"# Querybridge configuration

name: {}

server:
  port: 8080
  log_level: 1
  enable_cors: false
  request_timeout_secs: 30
  shutdown_grace_secs: 10

{}
  # Outputs of at least this many bytes are kept in the blob store
  inline_threshold: {}
"#,
            self.name, storage, DEFAULT_INLINE_THRESHOLD
        )
    }

    /// Generate .env.example content
    fn generate_env_example(&self) -> String {
        r#"# MongoDB connection URL
MONGO_URL=mongodb://localhost:27017

# Add other environment variables here
"#
        .to_string()
    }
}
