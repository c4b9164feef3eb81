//! Configuration management for chargemanager
//!
//! This module handles loading, normalization, and validation of the
//! application configuration. Values come from built-in defaults, an optional
//! YAML file, and command-line overrides (see [`crate::cli`]).
//!
//! Out-of-range numeric options never abort startup: [`Config::normalize`]
//! silently resets them to their documented defaults. The only fatal check is
//! the vehicle identifier in [`Config::validate`].

use crate::error::{ChargeManagerError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

mod defaults;

pub use defaults::*;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// MQTT broker connection configuration
    pub mqtt: MqttConfig,

    /// Vehicle identity and topic namespace
    pub vehicle: VehicleConfig,

    /// Charging policy parameters
    pub policy: PolicyConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// MQTT broker parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// Broker host name or address
    pub host: String,

    /// Broker TCP port
    pub port: u16,

    /// Optional login user
    pub user: Option<String>,

    /// Optional login password; only used together with `user`
    pub password: Option<String>,

    /// Quality of service for subscriptions and publishes (0..2)
    pub qos: u8,

    /// Retain flag for outbound commands
    pub retain: bool,

    /// Keep-alive of the subscriber connection in seconds
    pub keep_alive_secs: u64,

    /// Pause before the subscriber reconnects after a transport failure
    pub reconnect_delay_ms: u64,

    /// Upper bound for one complete connect/publish/disconnect cycle
    pub publish_timeout_secs: u64,
}

/// Vehicle identity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    /// Vehicle identification number (exactly 17 characters)
    pub vin: String,

    /// Prefix of the vehicle bridge topics
    pub prefix: String,
}

/// Charging policy parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Power withheld for house battery charging while the pump is off
    pub battery_reserve_watts: i64,

    /// Power the house battery may discharge while the pump is on
    pub battery_max_discharge_watts: i64,

    /// Whether the SoC hysteresis gates house battery support
    pub hysteresis_enabled: bool,

    /// House battery SoC below which support is withdrawn
    pub hysteresis_min: i64,

    /// House battery SoC at or above which support is granted
    pub hysteresis_max: i64,

    /// Runtime budget in hours (1..10)
    pub runtime_hours: i64,

    /// Target SoC of the vehicle (30..100, multiple of 10)
    pub target_soc_pct: i64,

    /// Always charge with reduced current
    pub reduced: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Optional log file or directory; daily rotation when set
    pub file: Option<String>,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from an explicit path or the default locations
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        for path in DEFAULT_CONFIG_PATHS {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        Ok(Config::default())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Reset out-of-range values to their defaults
    pub fn normalize(&mut self) {
        if self.mqtt.host.trim().is_empty() {
            self.mqtt.host = DEFAULT_MQTT_HOST.to_string();
        }
        if self.mqtt.qos > 2 {
            self.mqtt.qos = 0;
        }
        if self.mqtt.port == 0 {
            self.mqtt.port = DEFAULT_MQTT_PORT;
        }
        if self.vehicle.prefix.trim().is_empty() {
            self.vehicle.prefix = DEFAULT_TOPIC_PREFIX.to_string();
        }

        let policy = &mut self.policy;
        policy.battery_reserve_watts = policy.battery_reserve_watts.saturating_abs();
        policy.battery_max_discharge_watts = policy.battery_max_discharge_watts.saturating_abs();

        if !(30..=100).contains(&policy.target_soc_pct) || policy.target_soc_pct % 10 != 0 {
            policy.target_soc_pct = TARGET_SOC_DEFAULT;
        }
        if !(0..=100).contains(&policy.hysteresis_min) {
            policy.hysteresis_min = HYSTERESIS_MIN_DEFAULT;
        }
        if !(0..=100).contains(&policy.hysteresis_max) {
            policy.hysteresis_max = HYSTERESIS_MAX_DEFAULT;
        }
        if policy.hysteresis_min >= policy.hysteresis_max {
            policy.hysteresis_min = HYSTERESIS_MIN_DEFAULT;
            policy.hysteresis_max = HYSTERESIS_MAX_DEFAULT;
        }
        if !(1..=10).contains(&policy.runtime_hours) {
            policy.runtime_hours = RUNTIME_HOURS_DEFAULT;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.vehicle.vin.chars().count() != VIN_LENGTH {
            return Err(ChargeManagerError::validation(
                "vehicle.vin",
                "VIN must have 17 characters",
            ));
        }
        Ok(())
    }

    /// One-line startup summary of the effective policy
    pub fn summary(&self) -> String {
        let p = &self.policy;
        let hysteresis = if p.hysteresis_enabled {
            format!(
                "hysteresis_min = {} hysteresis_max = {}",
                p.hysteresis_min, p.hysteresis_max
            )
        } else {
            "hysteresis = off".to_string()
        };
        format!(
            "battery_max = {} {} runtime = {} target_soc = {}",
            p.battery_max_discharge_watts, hysteresis, p.runtime_hours, p.target_soc_pct
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.vehicle.vin = "WVXZZZ12345678900".to_string();
        config
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.mqtt.host, "localhost");
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.vehicle.prefix, "weconnect");
        assert_eq!(config.policy.battery_max_discharge_watts, 4500);
        assert_eq!(config.policy.battery_reserve_watts, 0);
        assert_eq!(config.policy.target_soc_pct, 80);
        assert!(config.policy.hysteresis_enabled);
    }

    #[test]
    fn test_config_validation() {
        let mut config = valid_config();
        assert!(config.validate().is_ok());

        config.vehicle.vin = "SHORT".to_string();
        assert!(config.validate().is_err());

        config.vehicle.vin = "WVXZZZ123456789001".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_normalize_resets_out_of_range_values() {
        let mut config = valid_config();
        config.mqtt.qos = 3;
        config.policy.target_soc_pct = 75;
        config.policy.runtime_hours = 11;
        config.policy.hysteresis_min = 101;
        config.policy.battery_max_discharge_watts = -3000;
        config.normalize();

        assert_eq!(config.mqtt.qos, 0);
        assert_eq!(config.policy.target_soc_pct, TARGET_SOC_DEFAULT);
        assert_eq!(config.policy.runtime_hours, RUNTIME_HOURS_DEFAULT);
        assert_eq!(config.policy.hysteresis_min, HYSTERESIS_MIN_DEFAULT);
        assert_eq!(config.policy.battery_max_discharge_watts, 3000);
    }

    #[test]
    fn test_normalize_handles_extreme_watts_and_port() {
        let mut config = valid_config();
        config.mqtt.port = 0;
        config.policy.battery_reserve_watts = i64::MIN;
        config.policy.battery_max_discharge_watts = i64::MIN;
        config.normalize();

        assert_eq!(config.mqtt.port, DEFAULT_MQTT_PORT);
        assert_eq!(config.policy.battery_reserve_watts, i64::MAX);
        assert_eq!(config.policy.battery_max_discharge_watts, i64::MAX);
    }

    #[test]
    fn test_normalize_resets_inverted_hysteresis_pair() {
        let mut config = valid_config();
        config.policy.hysteresis_min = 90;
        config.policy.hysteresis_max = 60;
        config.normalize();
        assert_eq!(config.policy.hysteresis_min, 85);
        assert_eq!(config.policy.hysteresis_max, 95);

        config.policy.hysteresis_min = 40;
        config.policy.hysteresis_max = 70;
        config.normalize();
        assert_eq!(config.policy.hysteresis_min, 40);
        assert_eq!(config.policy.hysteresis_max, 70);
    }

    #[test]
    fn test_summary_mentions_hysteresis_state() {
        let mut config = valid_config();
        assert_eq!(
            config.summary(),
            "battery_max = 4500 hysteresis_min = 85 hysteresis_max = 95 runtime = 8 target_soc = 80"
        );
        config.policy.hysteresis_enabled = false;
        assert!(config.summary().contains("hysteresis = off"));
    }

    #[test]
    fn test_config_serialization() {
        let config = valid_config();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let deserialized: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(config.vehicle.vin, deserialized.vehicle.vin);
        assert_eq!(config.mqtt.port, deserialized.mqtt.port);
    }
}
