//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! The device boots without a config file: every field has a production
//! default, and a missing file at the default path just logs and falls back.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::{Result, TrackerError};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub csc: CscConfig,
    #[serde(default)]
    pub sensor: SensorConfig,
}

/// Device identity configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DeviceConfig {
    /// BLE advertising name
    #[serde(default = "default_device_name")]
    pub name: String,
}

/// Session lifecycle configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    /// Inactivity before an active session is automatically ended
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,

    /// Interval between periodic saves of the active session
    #[serde(default = "default_save_interval_secs")]
    pub save_interval_secs: u64,

    /// Sessions shorter than this are discarded (accidental taps)
    #[serde(default = "default_min_duration_secs")]
    pub min_duration_secs: u32,
}

/// Record storage configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Directory holding one JSON record file per session
    #[serde(default = "default_sessions_dir")]
    pub sessions_dir: String,
}

/// CSC notification configuration
#[derive(Debug, Deserialize, Clone)]
pub struct CscConfig {
    /// Interval between CSC Measurement notifications.
    ///
    /// 2s rather than the spec-typical 1Hz: with one reed event per crank
    /// rotation, slow pedaling at 1Hz alternates between a real cadence and
    /// 0 RPM, which flickers on client displays.
    #[serde(default = "default_notify_interval_secs")]
    pub notify_interval_secs: u64,
}

/// Crank sensor configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SensorConfig {
    /// Debounce window for reed switch bounces
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

// Default value functions
fn default_device_name() -> String { "BikeTracker".to_string() }
fn default_idle_timeout_ms() -> u64 { 10 * 60 * 1000 }
fn default_save_interval_secs() -> u64 { 5 * 60 }
fn default_min_duration_secs() -> u32 { 5 * 60 }
fn default_sessions_dir() -> String { "sessions".to_string() }
fn default_notify_interval_secs() -> u64 { 2 }
fn default_debounce_ms() -> u64 { 50 }

impl Default for DeviceConfig {
    fn default() -> Self {
        Self { name: default_device_name() }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_ms: default_idle_timeout_ms(),
            save_interval_secs: default_save_interval_secs(),
            min_duration_secs: default_min_duration_secs(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { sessions_dir: default_sessions_dir() }
    }
}

impl Default for CscConfig {
    fn default() -> Self {
        Self { notify_interval_secs: default_notify_interval_secs() }
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self { debounce_ms: default_debounce_ms() }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, TOML parsing fails, or
    /// validation fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration, falling back to defaults when the file is absent
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        match fs::metadata(&path) {
            Ok(_) => Self::load(path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    "No config file at {:?}, using defaults",
                    path.as_ref()
                );
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.device.name.is_empty() {
            return Err(TrackerError::ConfigInvalid(
                "device name cannot be empty".to_string(),
            ));
        }

        if self.storage.sessions_dir.is_empty() {
            return Err(TrackerError::ConfigInvalid(
                "sessions_dir cannot be empty".to_string(),
            ));
        }

        if self.session.idle_timeout_ms == 0 {
            return Err(TrackerError::ConfigInvalid(
                "idle_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.session.save_interval_secs == 0 {
            return Err(TrackerError::ConfigInvalid(
                "save_interval_secs must be greater than 0".to_string(),
            ));
        }

        if self.csc.notify_interval_secs == 0 || self.csc.notify_interval_secs > 60 {
            return Err(TrackerError::ConfigInvalid(
                "notify_interval_secs must be between 1 and 60".to_string(),
            ));
        }

        if self.sensor.debounce_ms > 1000 {
            return Err(TrackerError::ConfigInvalid(
                "debounce_ms must be at most 1000".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_match_production_policy() {
        let config = Config::default();
        assert_eq!(config.device.name, "BikeTracker");
        assert_eq!(config.session.idle_timeout_ms, 600_000);
        assert_eq!(config.session.save_interval_secs, 300);
        assert_eq!(config.session.min_duration_secs, 300);
        assert_eq!(config.storage.sessions_dir, "sessions");
        assert_eq!(config.csc.notify_interval_secs, 2);
        assert_eq!(config.sensor.debounce_ms, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[session]\nidle_timeout_ms = 30000\n\n[device]\nname = \"DevTracker\""
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.session.idle_timeout_ms, 30_000);
        assert_eq!(config.device.name, "DevTracker");
        // Untouched sections keep their defaults
        assert_eq!(config.session.save_interval_secs, 300);
        assert_eq!(config.csc.notify_interval_secs, 2);
    }

    #[test]
    fn test_load_or_default_with_missing_file() {
        let config = Config::load_or_default("/nonexistent/tracker.toml").unwrap();
        assert_eq!(config.device.name, "BikeTracker");
    }

    #[test]
    fn test_load_rejects_invalid_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not valid toml [[[").unwrap();
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_validate_rejects_zero_intervals() {
        let mut config = Config::default();
        config.session.idle_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.csc.notify_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.session.save_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_strings() {
        let mut config = Config::default();
        config.device.name.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.storage.sessions_dir.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_excessive_debounce() {
        let mut config = Config::default();
        config.sensor.debounce_ms = 5_000;
        assert!(config.validate().is_err());
    }
}
