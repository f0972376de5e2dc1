//! Configuration parsing for Querybridge
//!
//! This crate handles parsing of the YAML service configuration,
//! validation, and environment variable substitution.

pub mod env;
pub mod validator;
pub mod yaml;

pub use validator::ConfigValidator;
pub use yaml::YamlParser;

use querybridge_core::{Config, QueryError};

/// Parse a configuration file from a path
pub fn parse_file(path: &str) -> Result<Config, QueryError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| QueryError::Config(format!("Failed to read file '{}': {}", path, e)))?;

    parse_string(&content)
}

/// Parse a configuration from a string
pub fn parse_string(content: &str) -> Result<Config, QueryError> {
    let config = YamlParser::parse(content)?;

    let validator = ConfigValidator::new();
    validator.validate(&config)?;

    Ok(config)
}
