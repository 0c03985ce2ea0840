//! Engine configuration.
//!
//! # Example (YAML)
//!
//! ```yaml
//! timezone: "Europe/Vienna"
//! default_refresh_rate: 900  # 15 minutes
//!
//! cache:
//!   directory: "storage/app/public/images/generated"
//!   grace_period_secs: 300
//!   sweep_interval_secs: 3600
//! ```
//!
//! Every field is optional.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use serde::Deserialize;

use crate::clock::SystemClock;
use crate::sweep::FsCacheStorage;
use crate::Error;

/// Engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Timezone for sleep and playlist windows (e.g., "America/New_York")
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Refresh rate when neither playlist nor device sets one (seconds)
    #[serde(default = "default_refresh_rate")]
    pub default_refresh_rate: u32,

    /// Render cache settings
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Render cache settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Directory holding rendered images
    #[serde(default = "default_cache_dir")]
    pub directory: PathBuf,

    /// Minimum age of an orphaned render before deletion (seconds)
    #[serde(default = "default_grace_period_secs")]
    pub grace_period_secs: u64,

    /// Interval between background sweeps (seconds)
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_refresh_rate() -> u32 {
    900
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("storage/images/generated")
}

fn default_grace_period_secs() -> u64 {
    300
}

fn default_sweep_interval_secs() -> u64 {
    3600
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: default_cache_dir(),
            grace_period_secs: default_grace_period_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            default_refresh_rate: default_refresh_rate(),
            cache: CacheConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, Error> {
        serde_yaml::from_str(yaml).map_err(|e| Error::Config(format!("Invalid config YAML: {}", e)))
    }

    /// Configured timezone, or UTC if the name is unknown.
    pub fn tz(&self) -> Tz {
        self.timezone.parse().unwrap_or_else(|_| {
            tracing::warn!("Unknown timezone '{}', using UTC", self.timezone);
            chrono_tz::UTC
        })
    }

    /// System clock in the configured timezone.
    pub fn clock(&self) -> SystemClock {
        SystemClock::new(self.tz())
    }

    /// File storage for rendered images.
    pub fn cache_storage(&self) -> FsCacheStorage {
        FsCacheStorage::new(&self.cache.directory)
    }

    /// Grace period for orphan cleanup.
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.cache.grace_period_secs)
    }

    /// Interval between background sweeps.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.cache.sweep_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
timezone: "America/New_York"
default_refresh_rate: 300
cache:
  directory: "/var/lib/trmnl/generated"
  grace_period_secs: 60
"#;
        let config = EngineConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.timezone, "America/New_York");
        assert_eq!(config.tz(), chrono_tz::America::New_York);
        assert_eq!(config.default_refresh_rate, 300);
        assert_eq!(config.grace_period(), Duration::from_secs(60));
        // Unset fields keep their defaults
        assert_eq!(config.sweep_interval(), Duration::from_secs(3600));
        assert_eq!(
            config.cache_storage().dir(),
            Path::new("/var/lib/trmnl/generated")
        );
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = EngineConfig::from_yaml("{}").unwrap();
        assert_eq!(config.timezone, "UTC");
        assert_eq!(config.default_refresh_rate, 900);
        assert_eq!(config.grace_period(), Duration::from_secs(300));
        assert_eq!(config.cache.directory, PathBuf::from("storage/images/generated"));
    }

    #[test]
    fn test_unknown_timezone_falls_back_to_utc() {
        let config = EngineConfig {
            timezone: "Mars/Olympus_Mons".to_string(),
            ..Default::default()
        };
        assert_eq!(config.tz(), chrono_tz::UTC);
        assert_eq!(config.clock().timezone(), chrono_tz::UTC);
    }

    #[test]
    fn test_invalid_yaml() {
        let err = EngineConfig::from_yaml("default_refresh_rate: soon").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "timezone: \"Europe/Vienna\"").unwrap();
        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.tz(), chrono_tz::Europe::Vienna);

        let missing = EngineConfig::load("/definitely/not/here.yaml");
        assert!(matches!(missing, Err(Error::Config(_))));
    }
}
