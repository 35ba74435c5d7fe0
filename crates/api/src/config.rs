use std::str::FromStr;
use std::time::Duration;

use storefront_core::merge_lock::{MergeLockConfig, COOLDOWN_PERIOD, LOCK_TIMEOUT};
use storefront_core::pricing::DEFAULT_MAX_STOCK;

use crate::auth::jwt::JwtConfig;

/// Where merge-lock state lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockBackend {
    /// Per-process table. Correct only with a single API instance.
    Memory,
    /// The `merge_locks` table, shared by every instance.
    Postgres,
}

impl FromStr for LockBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "postgres" => Ok(Self::Postgres),
            other => Err(format!("unknown merge lock backend '{other}'")),
        }
    }
}

/// Guest-merge settings.
#[derive(Debug, Clone)]
pub struct MergeSettings {
    pub backend: LockBackend,
    pub lock: MergeLockConfig,
    /// Cap on any single cart line, applied on add, update and merge.
    pub max_item_quantity: u32,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            backend: LockBackend::Memory,
            lock: MergeLockConfig::default(),
            max_item_quantity: DEFAULT_MAX_STOCK,
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// JWT validation settings.
    pub jwt: JwtConfig,
    pub merge: MergeSettings,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                    |
    /// |-------------------------|----------------------------|
    /// | `HOST`                  | `0.0.0.0`                  |
    /// | `PORT`                  | `3000`                     |
    /// | `CORS_ORIGINS`          | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                       |
    /// | `MERGE_LOCK_BACKEND`    | `memory`                   |
    /// | `MERGE_COOLDOWN_MS`     | `5000`                     |
    /// | `MERGE_LOCK_TIMEOUT_MS` | `10000`                    |
    /// | `MAX_ITEM_QUANTITY`     | `1000`                     |
    ///
    /// # Panics
    ///
    /// Panics on any unparseable value so misconfiguration fails at startup.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = env_or("PORT", 3000);

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = env_or("REQUEST_TIMEOUT_SECS", 30);

        let backend: LockBackend = env_or("MERGE_LOCK_BACKEND", LockBackend::Memory);
        let cooldown_ms: u64 = env_or("MERGE_COOLDOWN_MS", COOLDOWN_PERIOD.as_millis() as u64);
        let timeout_ms: u64 = env_or("MERGE_LOCK_TIMEOUT_MS", LOCK_TIMEOUT.as_millis() as u64);
        let max_item_quantity: u32 = env_or("MAX_ITEM_QUANTITY", DEFAULT_MAX_STOCK);
        assert!(max_item_quantity > 0, "MAX_ITEM_QUANTITY must be positive");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            jwt: JwtConfig::from_env(),
            merge: MergeSettings {
                backend,
                lock: MergeLockConfig {
                    cooldown: Duration::from_millis(cooldown_ms),
                    lock_timeout: Duration::from_millis(timeout_ms),
                },
                max_item_quantity,
            },
        }
    }
}

/// Read and parse `key`, falling back to `default` when unset.
fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|e| panic!("{key} has an invalid value '{raw}': {e}")),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_backend_parses_case_insensitively() {
        assert_eq!("memory".parse::<LockBackend>(), Ok(LockBackend::Memory));
        assert_eq!(" Postgres ".parse::<LockBackend>(), Ok(LockBackend::Postgres));
        assert!("redis".parse::<LockBackend>().is_err());
    }

    #[test]
    fn merge_settings_default_to_documented_values() {
        let settings = MergeSettings::default();
        assert_eq!(settings.backend, LockBackend::Memory);
        assert_eq!(settings.lock.cooldown, Duration::from_millis(5000));
        assert_eq!(settings.lock.lock_timeout, Duration::from_millis(10000));
        assert_eq!(settings.max_item_quantity, 1000);
    }
}
