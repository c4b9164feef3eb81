//! Surplus power calculation
//!
//! The house battery either supports vehicle charging (pump on: it may
//! discharge up to `battery_max_discharge_watts`) or is being refilled
//! (pump off: `battery_reserve_watts` are withheld). The pump follows the
//! house battery SoC through a hysteresis band so that it does not flap
//! around a single threshold.

use crate::config::PolicyConfig;
use crate::telemetry::{PumpState, TelemetryState};

/// Hysteresis-gated surplus calculator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerBudget {
    pub hysteresis_min: i64,
    pub hysteresis_max: i64,
    pub battery_reserve_watts: i64,
    pub battery_max_discharge_watts: i64,
}

impl PowerBudget {
    pub fn from_policy(policy: &PolicyConfig) -> Self {
        Self {
            hysteresis_min: policy.hysteresis_min,
            hysteresis_max: policy.hysteresis_max,
            battery_reserve_watts: policy.battery_reserve_watts,
            battery_max_discharge_watts: policy.battery_max_discharge_watts,
        }
    }

    /// Next pump state for a house battery SoC reading
    pub fn next_pump(&self, pump: PumpState, battery_soc_pct: i64) -> PumpState {
        match pump {
            PumpState::Off if battery_soc_pct >= self.hysteresis_max => PumpState::On,
            PumpState::On if battery_soc_pct < self.hysteresis_min => PumpState::Off,
            unchanged => unchanged,
        }
    }

    /// Surplus available for the vehicle in watts; advances the pump state
    pub fn compute(&self, state: &mut TelemetryState) -> i64 {
        let solar = match state.solar_power_w {
            Some(w) if w > 0 => w,
            _ => return 0,
        };

        state.pump = self.next_pump(state.pump, state.battery_soc_pct);

        match state.pump {
            PumpState::On | PumpState::Disabled => solar
                .saturating_sub(state.home_power_w)
                .saturating_add(self.battery_max_discharge_watts),
            PumpState::Off => solar
                .saturating_sub(state.home_power_w)
                .saturating_sub(self.battery_reserve_watts),
        }
    }
}
