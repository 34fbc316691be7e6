//! Configuration management for the svckit framework.
//!
//! Services are configured with a single JSON file loaded at startup. Every
//! section carries serde defaults so a minimal file only needs the fields
//! that have no sensible default (the discovery self-description, when
//! discovery is enabled at all).

use crate::discovery_config::DiscoveryConfig;
use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main application configuration.
///
/// # Examples
///
/// ```no_run
/// use svckit_core::config::AppConfig;
///
/// let config = AppConfig::from_file("bench.json").unwrap();
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application-wide settings
    #[serde(default)]
    pub app: AppSection,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingSection,

    /// Timer scheduler configuration
    #[serde(default)]
    pub timer: TimerSection,

    /// Multicast discovery configuration; discovery runs only when present
    #[serde(default)]
    pub discovery: Option<DiscoveryConfig>,
}

impl AppConfig {
    /// Loads configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Self::from_str(&contents)
    }

    /// Loads configuration from a JSON string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::InvalidFormat {
            reason: e.to_string(),
        })?;

        Ok(config)
    }

    /// Validates all sections.
    pub fn validate(&self) -> Result<()> {
        self.app.validate()?;
        self.timer.validate()?;

        if let Some(discovery) = &self.discovery {
            discovery
                .validate()
                .map_err(|e| ConfigError::Invalid(format!("discovery: {e}")))?;
        }

        Ok(())
    }
}

/// Application-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSection {
    /// Human-readable service name, used for log context
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Capacity of the single-consumer event queue
    #[serde(default = "default_event_queue_capacity")]
    pub event_queue_capacity: usize,
}

impl AppSection {
    fn validate(&self) -> Result<()> {
        if self.service_name.is_empty() {
            return Err(ConfigError::Invalid("app.service_name cannot be empty".to_string()).into());
        }

        if self.event_queue_capacity == 0 {
            return Err(
                ConfigError::Invalid("app.event_queue_capacity cannot be 0".to_string()).into(),
            );
        }

        Ok(())
    }
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            event_queue_capacity: default_event_queue_capacity(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
    /// Log level filter (`trace`, `debug`, `info`, `warn`, `error`)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Timer scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerSection {
    /// How often the scheduler scans for expired timers, in milliseconds
    #[serde(default = "default_scan_interval_ms")]
    pub scan_interval_ms: u64,
}

impl TimerSection {
    fn validate(&self) -> Result<()> {
        if self.scan_interval_ms == 0 {
            return Err(
                ConfigError::Invalid("timer.scan_interval_ms cannot be 0".to_string()).into(),
            );
        }

        Ok(())
    }
}

impl Default for TimerSection {
    fn default() -> Self {
        Self {
            scan_interval_ms: default_scan_interval_ms(),
        }
    }
}

fn default_service_name() -> String {
    "svckit".to_string()
}

fn default_event_queue_capacity() -> usize {
    1024
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_scan_interval_ms() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.discovery.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let config = AppConfig::from_str(
            r#"{
                "app": { "service_name": "login", "event_queue_capacity": 256 },
                "logging": { "level": "debug" },
                "timer": { "scan_interval_ms": 20 },
                "discovery": {
                    "group_ip": "239.0.0.8",
                    "group_port": 8890,
                    "interface": "eth0",
                    "service_name": "login",
                    "instance_id": 1,
                    "advertise_ip": "10.0.0.1",
                    "advertise_port": 7000,
                    "data": "v1"
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.app.service_name, "login");
        assert_eq!(config.app.event_queue_capacity, 256);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.timer.scan_interval_ms, 20);

        let discovery = config.discovery.as_ref().unwrap();
        assert_eq!(discovery.service_name, "login");
        assert_eq!(discovery.instance_id, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = AppConfig::from_str("{}").unwrap();
        assert_eq!(config.app.event_queue_capacity, 1024);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.timer.scan_interval_ms, 10);
    }

    #[test]
    fn test_invalid_json_rejected() {
        assert!(AppConfig::from_str("not json").is_err());
    }

    #[test]
    fn test_invalid_discovery_section_fails_validation() {
        let config = AppConfig::from_str(
            r#"{
                "discovery": {
                    "service_name": "",
                    "instance_id": 1,
                    "advertise_ip": "10.0.0.1",
                    "advertise_port": 7000
                }
            }"#,
        )
        .unwrap();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_scan_interval_rejected() {
        let config = AppConfig::from_str(r#"{ "timer": { "scan_interval_ms": 0 } }"#).unwrap();
        assert!(config.validate().is_err());
    }
}
