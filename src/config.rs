//! Runtime configuration loaded from environment variables.
//!
//! Configuration is read once at startup and handed to the components that
//! need it. Nothing here is global; the signing secret in particular lives
//! only inside the [`AuthConfig`] passed to the token issuer.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use zeroize::Zeroizing;

pub const ENV_JWT_SECRET: &str = "ENROLLMENT_JWT_SECRET";
pub const ENV_HASH_COST: &str = "ENROLLMENT_HASH_COST";
pub const ENV_TOKEN_TTL_HOURS: &str = "ENROLLMENT_TOKEN_TTL_HOURS";
pub const ENV_DB_PATH: &str = "ENROLLMENT_DB_PATH";
pub const ENV_STORAGE_TIMEOUT_MS: &str = "ENROLLMENT_STORAGE_TIMEOUT_MS";

pub const DEFAULT_HASH_COST: u32 = 12;
pub const MIN_HASH_COST: u32 = 4;
pub const MAX_HASH_COST: u32 = 31;
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 72;
pub const DEFAULT_STORAGE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has invalid value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Settings for the credential store and the token issuer.
#[derive(Clone)]
pub struct AuthConfig {
    signing_secret: Zeroizing<Vec<u8>>,
    hash_cost: u32,
    token_ttl: chrono::Duration,
}

impl AuthConfig {
    /// Create a config with the given signing secret and default cost and TTL.
    pub fn new(signing_secret: impl Into<Vec<u8>>) -> Result<Self, ConfigError> {
        let signing_secret = Zeroizing::new(signing_secret.into());
        if signing_secret.is_empty() {
            return Err(ConfigError::Missing(ENV_JWT_SECRET));
        }
        Ok(Self {
            signing_secret,
            hash_cost: DEFAULT_HASH_COST,
            token_ttl: chrono::Duration::hours(DEFAULT_TOKEN_TTL_HOURS),
        })
    }

    /// Override the bcrypt work factor.
    pub fn with_hash_cost(mut self, cost: u32) -> Result<Self, ConfigError> {
        if !(MIN_HASH_COST..=MAX_HASH_COST).contains(&cost) {
            return Err(ConfigError::Invalid {
                key: ENV_HASH_COST,
                value: cost.to_string(),
                reason: "bcrypt cost must be between 4 and 31",
            });
        }
        self.hash_cost = cost;
        Ok(self)
    }

    pub fn with_token_ttl(mut self, ttl: chrono::Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. `from_env` uses the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let secret = lookup(ENV_JWT_SECRET).ok_or(ConfigError::Missing(ENV_JWT_SECRET))?;
        let mut config = Self::new(secret.into_bytes())?;

        if let Some(raw) = lookup(ENV_HASH_COST) {
            let cost = raw.trim().parse::<u32>().map_err(|_| ConfigError::Invalid {
                key: ENV_HASH_COST,
                value: raw.clone(),
                reason: "expected an integer",
            })?;
            config = config.with_hash_cost(cost)?;
        }

        if let Some(raw) = lookup(ENV_TOKEN_TTL_HOURS) {
            let hours = raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|h| *h > 0)
                .ok_or_else(|| ConfigError::Invalid {
                    key: ENV_TOKEN_TTL_HOURS,
                    value: raw.clone(),
                    reason: "expected a positive number of hours",
                })?;
            config = config.with_token_ttl(chrono::Duration::hours(hours));
        }

        Ok(config)
    }

    pub fn signing_secret(&self) -> &[u8] {
        &self.signing_secret
    }

    pub fn hash_cost(&self) -> u32 {
        self.hash_cost
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        self.token_ttl
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("signing_secret", &"<redacted>")
            .field("hash_cost", &self.hash_cost)
            .field("token_ttl", &self.token_ttl)
            .finish()
    }
}

/// Where the database lives and how long a storage call may take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// SQLite file. `None` means the platform data directory.
    pub path: Option<PathBuf>,
    /// Upper bound for a single storage operation, lock waits included.
    pub operation_timeout: Duration,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: None,
            operation_timeout: DEFAULT_STORAGE_TIMEOUT,
        }
    }
}

impl StorageConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let path = lookup(ENV_DB_PATH)
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        let operation_timeout = match lookup(ENV_STORAGE_TIMEOUT_MS) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .ok_or_else(|| ConfigError::Invalid {
                    key: ENV_STORAGE_TIMEOUT_MS,
                    value: raw.clone(),
                    reason: "expected a positive number of milliseconds",
                })?,
            None => DEFAULT_STORAGE_TIMEOUT,
        };

        Ok(Self {
            path,
            operation_timeout,
        })
    }
}
