//! Terminal conditions of a charging session
//!
//! Evaluated after every inbound message, independently of the command
//! rate limit. The first condition found ends the session; the engine then
//! only runs its shutdown housekeeping.

use crate::telemetry::{PlugState, TelemetryState};
use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};

/// Why the session ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopCondition {
    /// PV production reported an explicit zero
    NoSolarProduction,
    /// Plug went from connected to disconnected
    VehicleDisconnected,
    /// Odometer advanced past its session baseline
    VehicleMoving { odometer_km: i64 },
    /// Runtime budget exhausted
    RuntimeExpired,
}

impl fmt::Display for StopCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopCondition::NoSolarProduction => f.write_str("solar power is 0"),
            StopCondition::VehicleDisconnected => f.write_str("car has been disconnected"),
            StopCondition::VehicleMoving { odometer_km } => {
                write!(f, "car is moving (km = {})", odometer_km)
            }
            StopCondition::RuntimeExpired => f.write_str("runtime has expired"),
        }
    }
}

/// Detects terminal conditions from telemetry and the session clock
#[derive(Debug, Clone)]
pub struct StopEvaluator {
    runtime_budget: Duration,
    session_start: Option<Instant>,
}

impl StopEvaluator {
    pub fn new(runtime_hours: i64) -> Self {
        let hours = u64::try_from(runtime_hours).unwrap_or(0);
        Self {
            runtime_budget: Duration::from_secs(hours * 3600),
            session_start: None,
        }
    }

    pub fn runtime_budget(&self) -> Duration {
        self.runtime_budget
    }

    /// Start the session clock; later calls keep the first start
    pub fn start_session(&mut self, now: Instant) {
        self.session_start.get_or_insert(now);
    }

    pub fn session_start(&self) -> Option<Instant> {
        self.session_start
    }

    /// All conditions, in evaluation order
    pub fn check(&self, state: &TelemetryState, now: Instant) -> Option<StopCondition> {
        if state.solar_power_w == Some(0) {
            return Some(StopCondition::NoSolarProduction);
        }
        if state.plug_seen_connected && state.plug == PlugState::Disconnected {
            return Some(StopCondition::VehicleDisconnected);
        }
        if let (Some(baseline), Some(km)) = (state.odometer_baseline_km, state.odometer_km)
            && km > baseline
        {
            return Some(StopCondition::VehicleMoving { odometer_km: km });
        }
        self.check_runtime(now)
    }

    /// Runtime budget only; a session that never started cannot expire
    pub fn check_runtime(&self, now: Instant) -> Option<StopCondition> {
        let start = self.session_start?;
        if now.saturating_duration_since(start) > self.runtime_budget {
            Some(StopCondition::RuntimeExpired)
        } else {
            None
        }
    }
}
