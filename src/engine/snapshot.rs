use serde::Serialize;

use crate::telemetry::PumpState;

/// Point-in-time view of the controller for the status line
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub timestamp: String,
    pub vehicle_soc_pct: Option<i64>,
    pub vehicle_target_soc_pct: Option<i64>,
    pub cruising_range_km: Option<i64>,
    pub surplus_w: i64,
    pub charging_state: String,
    pub charge_current: String,
    pub pump: PumpState,
    pub solar_power_w: Option<i64>,
    pub home_power_w: i64,
    pub grid_power_w: i64,
    pub battery_power_w: i64,
    pub battery_soc_pct: i64,
}

fn or_unknown(value: Option<i64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

impl StatusSnapshot {
    /// Human-readable status without the timestamp
    pub fn status_line(&self) -> String {
        format!(
            "SOC={}({}) Range={}km surplus={}W State: {} {}",
            or_unknown(self.vehicle_soc_pct),
            or_unknown(self.vehicle_target_soc_pct),
            or_unknown(self.cruising_range_km),
            self.surplus_w,
            self.charging_state,
            self.charge_current
        )
    }
}

impl super::ChargeManager {
    pub fn snapshot(&self) -> StatusSnapshot {
        let s = &self.state;
        StatusSnapshot {
            timestamp: chrono::Local::now().to_rfc3339(),
            vehicle_soc_pct: s.vehicle_soc_pct,
            vehicle_target_soc_pct: s.vehicle_target_soc_pct,
            cruising_range_km: s.cruising_range_km,
            surplus_w: self.power_available_w,
            charging_state: s.charging_state.to_string(),
            charge_current: s.max_charge_current.to_string(),
            pump: s.pump,
            solar_power_w: s.solar_power_w,
            home_power_w: s.home_power_w,
            grid_power_w: s.grid_power_w,
            battery_power_w: s.battery_power_w,
            battery_soc_pct: s.battery_soc_pct,
        }
    }
}
