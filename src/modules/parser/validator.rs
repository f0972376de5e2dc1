//! Configuration validation

use once_cell::sync::Lazy;
use querybridge_core::{Config, QueryError, StorageBackend, MAX_INLINE_THRESHOLD};
use regex::Regex;

/// Regex pattern for valid names (lower-kebab-case or lower_snake_case)
static NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z][a-z0-9]*(?:[-_][a-z0-9]+)*$").expect("valid name pattern")
});

/// Configuration validator
pub struct ConfigValidator {
    /// Whether to validate names strictly
    strict_names: bool,
}

impl ConfigValidator {
    /// Create a new validator with default settings
    pub fn new() -> Self {
        Self { strict_names: true }
    }

    /// Create a validator with lenient name checking
    pub fn lenient() -> Self {
        Self {
            strict_names: false,
        }
    }

    /// Validate the entire configuration
    pub fn validate(&self, config: &Config) -> Result<(), QueryError> {
        self.validate_name(&config.name)?;
        self.validate_server(config)?;
        self.validate_storage(config)?;
        Ok(())
    }

    fn validate_name(&self, name: &str) -> Result<(), QueryError> {
        if name.is_empty() {
            return Err(QueryError::Validation(
                "Service name cannot be empty".to_string(),
            ));
        }

        if self.strict_names && !NAME_PATTERN.is_match(name) {
            return Err(QueryError::Validation(format!(
                "Invalid service name '{}': must be lower-kebab-case or lower_snake_case",
                name
            )));
        }

        Ok(())
    }

    fn validate_server(&self, config: &Config) -> Result<(), QueryError> {
        if let Some(port) = &config.server.port {
            port.parse::<u16>().map_err(|_| {
                QueryError::Validation(format!("Invalid server port '{}'", port))
            })?;
        }

        if let Some(level) = config.server.log_level {
            if level > 3 {
                return Err(QueryError::Validation(format!(
                    "Invalid log level {}: expected 0 (DEBUG) to 3 (ERROR)",
                    level
                )));
            }
        }

        Ok(())
    }

    fn validate_storage(&self, config: &Config) -> Result<(), QueryError> {
        let storage = &config.storage;

        if storage.inline_threshold == 0 || storage.inline_threshold > MAX_INLINE_THRESHOLD {
            return Err(QueryError::Validation(format!(
                "Inline threshold must be between 1 and {} bytes, got {}",
                MAX_INLINE_THRESHOLD, storage.inline_threshold
            )));
        }

        if storage.backend == StorageBackend::Mongodb {
            let required = [
                ("url", &storage.url),
                ("database", &storage.database),
                ("collection", &storage.collection),
                ("bucket", &storage.bucket),
            ];
            for (field, value) in required {
                if value.trim().is_empty() {
                    return Err(QueryError::Validation(format!(
                        "MongoDB storage requires a non-empty '{}'",
                        field
                    )));
                }
            }
        }

        Ok(())
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}
