//! Environment variable substitution

use once_cell::sync::Lazy;
use querybridge_core::QueryError;
use regex::Regex;

/// Regex pattern for environment variable placeholders: {{ env.VAR_NAME }}
static ENV_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*env\.([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("valid env pattern")
});

/// Replaces `{{ env.NAME }}` placeholders in configuration text
pub struct EnvSubstitutor {
    /// Fail on missing variables instead of leaving the placeholder
    strict: bool,
}

impl EnvSubstitutor {
    pub fn new() -> Self {
        Self { strict: true }
    }

    pub fn lenient() -> Self {
        Self { strict: false }
    }

    /// Substitute environment variables in the given content.
    ///
    /// A `.env` file in the working directory is loaded first when present.
    pub fn substitute(&self, content: &str) -> Result<String, QueryError> {
        let _ = dotenvy::dotenv();
        self.substitute_with(content, |name| std::env::var(name).ok())
    }

    /// Substitute using an explicit lookup; all missing names are reported at once
    pub fn substitute_with<F>(&self, content: &str, lookup: F) -> Result<String, QueryError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing: Vec<String> = Vec::new();

        let result = ENV_PATTERN.replace_all(content, |caps: &regex::Captures<'_>| {
            let name = &caps[1];
            match lookup(name) {
                Some(value) => value,
                None => {
                    if self.strict && !missing.iter().any(|m| m == name) {
                        missing.push(name.to_string());
                    }
                    caps[0].to_string()
                }
            }
        });

        if !missing.is_empty() {
            return Err(QueryError::EnvVarNotFound(missing.join(", ")));
        }

        Ok(result.into_owned())
    }

    /// Check if a string contains environment variable placeholders
    pub fn has_placeholders(content: &str) -> bool {
        ENV_PATTERN.is_match(content)
    }
}

impl Default for EnvSubstitutor {
    fn default() -> Self {
        Self::new()
    }
}
