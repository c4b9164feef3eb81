//! Command line surface
//!
//! Flags override the matching values of the loaded YAML configuration.
//! Range checks are left to [`Config::normalize`], so out-of-range values
//! (including negative numbers) fall back to defaults instead of failing.

use crate::config::Config;
use crate::logging::{min_level, parse_log_level};
use clap::Parser;
use std::path::PathBuf;
use tracing::Level;

/// Surplus-PV charging controller for a vehicle behind an MQTT bridge
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "chargemanager", version = env!("APP_VERSION"), about, allow_negative_numbers = true)]
pub struct Args {
    /// YAML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// MQTT broker host
    #[arg(long)]
    pub host: Option<String>,

    /// MQTT broker port
    #[arg(long)]
    pub port: Option<i64>,

    #[arg(long)]
    pub user: Option<String>,

    #[arg(long)]
    pub password: Option<String>,

    /// MQTT quality of service (0..2)
    #[arg(long)]
    pub qos: Option<i64>,

    /// Retain published commands (0|1)
    #[arg(long)]
    pub retain: Option<i64>,

    /// Vehicle identification number (17 characters)
    #[arg(long)]
    pub vin: Option<String>,

    /// House battery power reserved for the house (W)
    #[arg(long)]
    pub battery: Option<i64>,

    /// House battery discharge power available to the vehicle (W)
    #[arg(long = "battery_max")]
    pub battery_max: Option<i64>,

    /// Let the house battery always support charging
    #[arg(long = "no_hysteresis")]
    pub no_hysteresis: bool,

    /// House battery SoC below which support stops (%)
    #[arg(long = "hysteresis_min")]
    pub hysteresis_min: Option<i64>,

    /// House battery SoC from which support starts (%)
    #[arg(long = "hysteresis_max")]
    pub hysteresis_max: Option<i64>,

    /// Topic prefix of the vehicle bridge
    #[arg(long)]
    pub prefix: Option<String>,

    /// Target SoC of the vehicle (30..100, multiple of 10)
    #[arg(long = "target_soc")]
    pub target_soc: Option<i64>,

    /// Always charge with reduced current
    #[arg(long)]
    pub reduced: bool,

    /// Runtime budget in hours (1..10)
    #[arg(long)]
    pub runtime: Option<i64>,

    /// Verbose logging
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl Args {
    /// Overlay the given flags onto `config`
    pub fn apply(&self, config: &mut Config) {
        let mqtt = &mut config.mqtt;
        if let Some(host) = &self.host {
            mqtt.host = host.clone();
        }
        if let Some(port) = self.port {
            mqtt.port = u16::try_from(port).unwrap_or(0);
        }
        if let Some(user) = &self.user {
            mqtt.user = Some(user.clone());
        }
        if let Some(password) = &self.password {
            mqtt.password = Some(password.clone());
        }
        if let Some(qos) = self.qos {
            mqtt.qos = u8::try_from(qos).unwrap_or(u8::MAX);
        }
        if let Some(retain) = self.retain {
            mqtt.retain = retain == 1;
        }

        if let Some(vin) = &self.vin {
            config.vehicle.vin = vin.clone();
        }
        if let Some(prefix) = &self.prefix {
            config.vehicle.prefix = prefix.clone();
        }

        let policy = &mut config.policy;
        if let Some(watts) = self.battery {
            policy.battery_reserve_watts = watts;
        }
        if let Some(watts) = self.battery_max {
            policy.battery_max_discharge_watts = watts;
        }
        if self.no_hysteresis {
            policy.hysteresis_enabled = false;
        }
        if let Some(pct) = self.hysteresis_min {
            policy.hysteresis_min = pct;
        }
        if let Some(pct) = self.hysteresis_max {
            policy.hysteresis_max = pct;
        }
        if let Some(pct) = self.target_soc {
            policy.target_soc_pct = pct;
        }
        if self.reduced {
            policy.reduced = true;
        }
        if let Some(hours) = self.runtime {
            policy.runtime_hours = hours;
        }

        if self.verbose {
            let configured = parse_log_level(&config.logging.level).unwrap_or(Level::INFO);
            config.logging.level = min_level(configured, Level::DEBUG).to_string();
        }
    }
}
