use super::*;

pub const DEFAULT_CONFIG_PATHS: [&str; 2] =
    ["chargemanager.yaml", "/etc/chargemanager/config.yaml"];

pub const DEFAULT_MQTT_HOST: &str = "localhost";
pub const DEFAULT_MQTT_PORT: u16 = 1883;
pub const DEFAULT_TOPIC_PREFIX: &str = "weconnect";

pub const VIN_LENGTH: usize = 17;

pub const BATTERY_MAX_POWER_DEFAULT: i64 = 4500;
pub const HYSTERESIS_MIN_DEFAULT: i64 = 85;
pub const HYSTERESIS_MAX_DEFAULT: i64 = 95;
pub const RUNTIME_HOURS_DEFAULT: i64 = 8;
pub const TARGET_SOC_DEFAULT: i64 = 80;

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_MQTT_HOST.to_string(),
            port: DEFAULT_MQTT_PORT,
            user: None,
            password: None,
            qos: 0,
            retain: false,
            keep_alive_secs: 60,
            reconnect_delay_ms: 500,
            publish_timeout_secs: 10,
        }
    }
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            vin: String::new(),
            prefix: DEFAULT_TOPIC_PREFIX.to_string(),
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            battery_reserve_watts: 0,
            battery_max_discharge_watts: BATTERY_MAX_POWER_DEFAULT,
            hysteresis_enabled: true,
            hysteresis_min: HYSTERESIS_MIN_DEFAULT,
            hysteresis_max: HYSTERESIS_MAX_DEFAULT,
            runtime_hours: RUNTIME_HOURS_DEFAULT,
            target_soc_pct: TARGET_SOC_DEFAULT,
            reduced: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            file: None,
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mqtt: MqttConfig::default(),
            vehicle: VehicleConfig::default(),
            policy: PolicyConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
