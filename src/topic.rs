//! MQTT topic layout
//!
//! Inbound topics are decoded segment by segment into a typed
//! `(Domain, Signal)` pair; nothing is matched by substring, so the
//! controller's own `_writetopic` echoes never read back as telemetry.
//!
//! Vehicle topics follow `<prefix>/vehicles/<vin>/domains/<domain>/<group>/<field>`,
//! house PV topics follow `e3dc/<source>/<quantity>`.

use crate::telemetry::Signal;
use serde::Serialize;

/// Subscription filters of the telemetry connection
pub const SUBSCRIPTION_FILTERS: [&str; 4] = [
    "+/vehicles/+/domains/charging/#",
    "+/vehicles/+/domains/measurements/#",
    "e3dc/+/power",
    "e3dc/battery/soc",
];

const HOUSE_PV_ROOT: &str = "e3dc";

/// Source domain of a decoded topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Domain {
    /// House photovoltaic system and battery
    HousePv,
    /// Vehicle charging domain
    Charging,
    /// Vehicle measurements domain
    Measurements,
}

/// Maps inbound topic strings to signals of one vehicle
#[derive(Debug, Clone)]
pub struct TopicDecoder {
    prefix: String,
    vin: String,
}

impl TopicDecoder {
    pub fn new(prefix: &str, vin: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            vin: vin.to_string(),
        }
    }

    /// Decode `topic`; `None` for topics that carry no observed signal
    pub fn decode(&self, topic: &str) -> Option<(Domain, Signal)> {
        let segments: Vec<&str> = topic.split('/').collect();
        match segments.as_slice() {
            [root, source, quantity] if *root == HOUSE_PV_ROOT => {
                decode_house_pv(source, quantity).map(|s| (Domain::HousePv, s))
            }
            [prefix, "vehicles", vin, "domains", domain, group, field]
                if *prefix == self.prefix && *vin == self.vin =>
            {
                decode_vehicle(domain, group, field)
            }
            _ => None,
        }
    }
}

fn decode_house_pv(source: &str, quantity: &str) -> Option<Signal> {
    match (source, quantity) {
        ("solar", "power") => Some(Signal::SolarPower),
        ("home", "power") => Some(Signal::HomePower),
        ("grid", "power") => Some(Signal::GridPower),
        ("battery", "power") => Some(Signal::BatteryPower),
        ("battery", "soc") => Some(Signal::BatterySoc),
        _ => None,
    }
}

fn decode_vehicle(domain: &str, group: &str, field: &str) -> Option<(Domain, Signal)> {
    let signal = match (domain, group, field) {
        ("charging", "chargingStatus", "chargingState") => Signal::ChargingState,
        ("charging", "batteryStatus", "currentSOC_pct") => Signal::VehicleSoc,
        ("charging", "batteryStatus", "cruisingRangeElectric_km") => Signal::CruisingRange,
        ("charging", "chargingSettings", "targetSOC_pct") => Signal::VehicleTargetSoc,
        ("charging", "chargingSettings", "maxChargeCurrentAC") => Signal::MaxChargeCurrent,
        ("charging", "plugStatus", "plugConnectionState") => Signal::PlugConnection,
        ("measurements", "odometerStatus", "odometer") => Signal::Odometer,
        _ => return None,
    };
    let domain = if domain == "measurements" {
        Domain::Measurements
    } else {
        Domain::Charging
    };
    Some((domain, signal))
}

/// Outbound command topics for one vehicle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlTopics {
    /// Accepts `reduced` or `maximum`
    pub charge_current: String,
    /// Accepts `start` or `stop`
    pub charging: String,
    /// Accepts the target SoC in percent
    pub target_soc: String,
    /// Polling interval of the vehicle bridge in seconds
    pub update_interval: String,
}

impl ControlTopics {
    pub fn new(prefix: &str, vin: &str) -> Self {
        Self {
            charge_current: format!(
                "{prefix}/vehicles/{vin}/domains/charging/chargingSettings/maxChargeCurrentAC_writetopic"
            ),
            charging: format!("{prefix}/vehicles/{vin}/controls/charging_writetopic"),
            target_soc: format!(
                "{prefix}/vehicles/{vin}/domains/charging/chargingSettings/targetSOC_pct_writetopic"
            ),
            update_interval: format!("{prefix}/mqtt/weconnectUpdateInterval_s_writetopic"),
        }
    }
}
