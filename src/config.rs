//! Service configuration
//!
//! Configuration is resolved once at startup from environment variables and
//! passed to collaborators explicitly. Nothing in the core pipeline reads
//! process state directly.

use serde::{Deserialize, Serialize};

use crate::error::RepixError;

/// Environment variable naming the allowed source hosts (comma-separated)
pub const ALLOWED_HOSTS_VAR: &str = "ALLOWED_HOSTS";

/// Environment variable overriding the cache TTL in hours
pub const CACHE_EXPIRATION_VAR: &str = "CACHE_EXPIRATION_HOURS";

/// Environment variable selecting production or development behavior
pub const APP_ENV_VAR: &str = "APP_ENV";

/// Runtime environment, controls how internal errors are rendered
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    fn from_var(value: Option<&str>) -> Self {
        match value {
            Some("production") => Environment::Production,
            _ => Environment::Development,
        }
    }
}

/// Default cache TTL: 2880 hours (120 days)
fn default_cache_expiration_hours() -> u32 {
    2880
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepixConfig {
    /// Hosts images may be fetched from
    pub allowed_hosts: Vec<String>,

    /// Cache TTL in hours (default: 2880)
    #[serde(default = "default_cache_expiration_hours")]
    pub cache_expiration_hours: u32,

    /// Append must-revalidate to Cache-Control
    #[serde(default)]
    pub must_revalidate: bool,

    /// Runtime environment (default: development)
    #[serde(default)]
    pub environment: Environment,
}

impl RepixConfig {
    /// Load configuration from process environment variables.
    ///
    /// `ALLOWED_HOSTS` is required; `CACHE_EXPIRATION_HOURS` and `APP_ENV`
    /// are optional.
    pub fn from_env() -> Result<Self, RepixError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an injected lookup. Tests use this to
    /// avoid mutating process-global environment state.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RepixError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let hosts_raw = lookup(ALLOWED_HOSTS_VAR)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| RepixError::ConfigurationMissing {
                name: ALLOWED_HOSTS_VAR.to_string(),
            })?;

        let allowed_hosts: Vec<String> = hosts_raw
            .split(',')
            .map(|h| h.trim().to_lowercase())
            .filter(|h| !h.is_empty())
            .collect();

        if allowed_hosts.is_empty() {
            return Err(RepixError::ConfigurationMissing {
                name: ALLOWED_HOSTS_VAR.to_string(),
            });
        }

        // Non-numeric TTL values fall back to the default rather than failing
        let cache_expiration_hours = lookup(CACHE_EXPIRATION_VAR)
            .and_then(|v| v.trim().parse::<u32>().ok())
            .filter(|&v| v > 0)
            .unwrap_or_else(default_cache_expiration_hours);

        let environment = Environment::from_var(lookup(APP_ENV_VAR).as_deref());

        Ok(Self {
            allowed_hosts,
            cache_expiration_hours,
            must_revalidate: false,
            environment,
        })
    }
}
