//! Environment configuration.
//!
//! The auth service URL and anonymous key are only meaningful together.
//! When either is missing the session gate runs with auth disabled.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

pub const ENV_AUTH_URL: &str = "MORPHIC_AUTH_URL";
pub const ENV_AUTH_ANON_KEY: &str = "MORPHIC_AUTH_ANON_KEY";
pub const ENV_AUTH_TIMEOUT_SECS: &str = "MORPHIC_AUTH_TIMEOUT_SECS";
pub const ENV_LOGIN_PATH: &str = "MORPHIC_LOGIN_PATH";
pub const ENV_CACHE_DIR: &str = "MORPHIC_CACHE_DIR";

const DEFAULT_AUTH_TIMEOUT_SECS: u64 = 10;
const DEFAULT_LOGIN_PATH: &str = "/auth/login";

/// Connection settings for the external auth service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthServiceConfig {
    /// Base URL of the auth service.
    pub url: String,
    /// Public anonymous key, sent as the bearer credential.
    pub anon_key: String,
    /// Timeout for a single current-user lookup.
    pub timeout: Duration,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Auth service settings. `None` disables session gating.
    pub auth: Option<AuthServiceConfig>,
    /// Route unauthenticated root requests are redirected to.
    pub login_path: String,
    /// Directory holding the local chat cache.
    pub cache_dir: PathBuf,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let timeout = match non_empty(ENV_AUTH_TIMEOUT_SECS) {
            Some(raw) => {
                let secs = raw
                    .trim()
                    .parse::<u64>()
                    .map_err(|e| ConfigError::InvalidValue {
                        key: ENV_AUTH_TIMEOUT_SECS.to_string(),
                        message: e.to_string(),
                    })?;
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_AUTH_TIMEOUT_SECS),
        };

        let auth = match (non_empty(ENV_AUTH_URL), non_empty(ENV_AUTH_ANON_KEY)) {
            (Some(url), Some(anon_key)) => Some(AuthServiceConfig {
                url,
                anon_key,
                timeout,
            }),
            (None, None) => None,
            _ => {
                tracing::warn!(
                    "{ENV_AUTH_URL} and {ENV_AUTH_ANON_KEY} must be set together; session gating is disabled"
                );
                None
            }
        };

        let login_path = non_empty(ENV_LOGIN_PATH).unwrap_or_else(|| DEFAULT_LOGIN_PATH.to_string());

        let cache_dir = non_empty(ENV_CACHE_DIR).map_or_else(default_cache_dir, PathBuf::from);

        Ok(Self {
            auth,
            login_path,
            cache_dir,
        })
    }
}

fn default_cache_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("morphic")
}
