//! Application configuration with documented constants
//!
//! Every tunable lives here with a note on what it controls. Values can be
//! overridden from a TOML file; anything missing keeps its default.

use crate::core::error::{PolicyError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for the view-model and the simulated router
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    // === REFRESH ===
    /// Minimum seconds between two non-forced refreshes
    ///
    /// A background refresh inside this window after the last successful
    /// fetch is dropped. Forced refreshes ignore it.
    pub refresh_cooldown_secs: i64,

    // === SIMULATED ROUTER ===
    /// Artificial delays applied by the in-memory router store
    pub latency: LatencyConfig,

    // === PERSISTENCE ===
    /// File holding saved credentials and the last successful URL
    pub credentials_path: PathBuf,
}

/// Per-operation delays for the fake router, in milliseconds
///
/// Defaults approximate a router on the local network answering its web API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatencyConfig {
    pub verify_ms: u64,
    pub fetch_policies_ms: u64,
    pub fetch_clients_ms: u64,
    /// Applies to single-client apply and clear
    pub single_mutation_ms: u64,
    /// Applies to apply-to-all and clear-from-all
    pub bulk_mutation_ms: u64,
    pub register_ms: u64,
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            verify_ms: 450,
            fetch_policies_ms: 250,
            fetch_clients_ms: 350,
            single_mutation_ms: 200,
            bulk_mutation_ms: 450,
            register_ms: 350,
        }
    }
}

impl LatencyConfig {
    /// No artificial delay at all
    pub fn zero() -> Self {
        Self {
            verify_ms: 0,
            fetch_policies_ms: 0,
            fetch_clients_ms: 0,
            single_mutation_ms: 0,
            bulk_mutation_ms: 0,
            register_ms: 0,
        }
    }

    pub fn verify(&self) -> Duration {
        Duration::from_millis(self.verify_ms)
    }

    pub fn fetch_policies(&self) -> Duration {
        Duration::from_millis(self.fetch_policies_ms)
    }

    pub fn fetch_clients(&self) -> Duration {
        Duration::from_millis(self.fetch_clients_ms)
    }

    pub fn single_mutation(&self) -> Duration {
        Duration::from_millis(self.single_mutation_ms)
    }

    pub fn bulk_mutation(&self) -> Duration {
        Duration::from_millis(self.bulk_mutation_ms)
    }

    pub fn register(&self) -> Duration {
        Duration::from_millis(self.register_ms)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            refresh_cooldown_secs: 30,
            latency: LatencyConfig::default(),
            credentials_path: PathBuf::from("policy_switcher_credentials.json"),
        }
    }
}

impl AppConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document, falling back to defaults for missing keys
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate().map_err(PolicyError::ConfigError)?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Cooldown as a duration; out-of-range values saturate
    pub fn refresh_cooldown(&self) -> chrono::Duration {
        chrono::Duration::try_seconds(self.refresh_cooldown_secs).unwrap_or(chrono::Duration::MAX)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.refresh_cooldown_secs < 0 {
            return Err(format!(
                "refresh_cooldown_secs ({}) must not be negative",
                self.refresh_cooldown_secs
            ));
        }

        if chrono::Duration::try_seconds(self.refresh_cooldown_secs).is_none() {
            return Err(format!(
                "refresh_cooldown_secs ({}) is out of range",
                self.refresh_cooldown_secs
            ));
        }

        if self.credentials_path.as_os_str().is_empty() {
            return Err("credentials_path must not be empty".into());
        }

        Ok(())
    }
}

// === GLOBAL CONFIG ACCESS ===

use std::sync::OnceLock;

static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Get the global config (initializes with defaults if not set)
pub fn config() -> &'static AppConfig {
    CONFIG.get_or_init(AppConfig::default)
}

/// Set the global config (can only be called once)
///
/// Returns Err if config was already set.
pub fn set_config(config: AppConfig) -> std::result::Result<(), AppConfig> {
    CONFIG.set(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.refresh_cooldown_secs, 30);
        assert_eq!(config.latency.verify_ms, 450);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            refresh_cooldown_secs = 10

            [latency]
            bulk_mutation_ms = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.refresh_cooldown_secs, 10);
        assert_eq!(config.latency.bulk_mutation_ms, 5);
        assert_eq!(config.latency.single_mutation_ms, 200);
        assert_eq!(
            config.credentials_path,
            PathBuf::from("policy_switcher_credentials.json")
        );
    }

    #[test]
    fn test_negative_cooldown_rejected() {
        let result = AppConfig::from_toml("refresh_cooldown_secs = -1");
        assert!(matches!(result, Err(PolicyError::ConfigError(_))));
    }

    #[test]
    fn test_oversized_cooldown_rejected() {
        let result = AppConfig::from_toml("refresh_cooldown_secs = 9223372036854775807");
        assert!(matches!(result, Err(PolicyError::ConfigError(_))));

        // constructed directly, bypassing validation
        let config = AppConfig {
            refresh_cooldown_secs: i64::MAX,
            ..AppConfig::default()
        };
        assert_eq!(config.refresh_cooldown(), chrono::Duration::MAX);
    }

    #[test]
    fn test_malformed_toml_rejected() {
        let result = AppConfig::from_toml("refresh_cooldown_secs = \"soon\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_latency() {
        let latency = LatencyConfig::zero();
        assert_eq!(latency.verify(), Duration::ZERO);
        assert_eq!(latency.bulk_mutation(), Duration::ZERO);
    }
}
