//! Charging command decisions
//!
//! Two independent axes are decided from the telemetry state and the
//! current surplus: the charge current level and the charge session itself.
//! Both share one rate limiter. Commands are fire-and-forget; a command that
//! got lost is re-issued by the next significant update because every guard
//! compares against the observed vehicle state, never against what was
//! requested earlier.

use crate::telemetry::{ChargeCurrentMode, ChargingState, TelemetryState};
use crate::topic::ControlTopics;
use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};

/// Surplus above which maximum current is worth it and charging may start
pub const REDUCED_CHARGE_POWER_W: i64 = 5500;

/// Surplus a new charge session needs
pub const START_CHARGE_SURPLUS_W: i64 = REDUCED_CHARGE_POWER_W;

/// Deficit below which a reduced-current session is stopped
pub const STOP_CHARGE_DEFICIT_W: i64 = -250;

/// Minimum spacing between two dispatch evaluations
pub const FAST_INTERVAL: Duration = Duration::from_secs(10);

/// Vehicle bridge polling interval while the controller runs
pub const UPDATE_INTERVAL_FAST_SECS: u32 = 10;

/// Vehicle bridge polling interval restored on shutdown
pub const UPDATE_INTERVAL_DEFAULT_SECS: u32 = 300;

/// Charge current level that can be requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChargeCurrent {
    Reduced,
    Maximum,
}

impl ChargeCurrent {
    pub fn as_payload(self) -> &'static str {
        match self {
            ChargeCurrent::Reduced => "reduced",
            ChargeCurrent::Maximum => "maximum",
        }
    }
}

/// Outbound command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Command {
    SetChargeCurrent(ChargeCurrent),
    StartCharging,
    StopCharging,
    SetTargetSoc(i64),
    SetUpdateInterval(u32),
}

impl Command {
    /// Topic the command is published on
    pub fn topic<'a>(&self, topics: &'a ControlTopics) -> &'a str {
        match self {
            Command::SetChargeCurrent(_) => &topics.charge_current,
            Command::StartCharging | Command::StopCharging => &topics.charging,
            Command::SetTargetSoc(_) => &topics.target_soc,
            Command::SetUpdateInterval(_) => &topics.update_interval,
        }
    }

    /// Wire payload
    pub fn payload(&self) -> String {
        match self {
            Command::SetChargeCurrent(level) => level.as_payload().to_string(),
            Command::StartCharging => "start".to_string(),
            Command::StopCharging => "stop".to_string(),
            Command::SetTargetSoc(pct) => pct.to_string(),
            Command::SetUpdateInterval(secs) => secs.to_string(),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::SetChargeCurrent(ChargeCurrent::Maximum) => {
                f.write_str("switch to maximum charging power")
            }
            Command::SetChargeCurrent(ChargeCurrent::Reduced) => {
                f.write_str("switch to reduced charging power")
            }
            Command::StartCharging => f.write_str("start charging"),
            Command::StopCharging => f.write_str("stop charging"),
            Command::SetTargetSoc(pct) => write!(f, "set target SoC to {}%", pct),
            Command::SetUpdateInterval(secs) => write!(f, "set update interval to {}s", secs),
        }
    }
}

/// Shared gate of both command axes
#[derive(Debug, Clone)]
pub struct RateLimiter {
    interval: Duration,
    last_action_at: Option<Instant>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_action_at: None,
        }
    }

    /// Strictly more than one interval since the last evaluation
    pub fn ready(&self, now: Instant) -> bool {
        match self.last_action_at {
            None => true,
            Some(last) => now.saturating_duration_since(last) > self.interval,
        }
    }

    pub fn mark(&mut self, now: Instant) {
        self.last_action_at = Some(now);
    }

    pub fn last_action_at(&self) -> Option<Instant> {
        self.last_action_at
    }
}

/// Rate-limited command decision
#[derive(Debug, Clone)]
pub struct Dispatcher {
    reduced_forced: bool,
    limiter: RateLimiter,
}

impl Dispatcher {
    pub fn new(reduced_forced: bool) -> Self {
        Self::with_interval(reduced_forced, FAST_INTERVAL)
    }

    pub fn with_interval(reduced_forced: bool, interval: Duration) -> Self {
        Self {
            reduced_forced,
            limiter: RateLimiter::new(interval),
        }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Decide commands for a processed message.
    ///
    /// Nothing is evaluated unless the message was significant and the rate
    /// limiter is open. An evaluation closes the limiter for one interval
    /// whether or not it produced commands.
    pub fn evaluate(
        &mut self,
        state: &TelemetryState,
        power_available_w: i64,
        significant: bool,
        now: Instant,
    ) -> Vec<Command> {
        if !significant || !self.limiter.ready(now) {
            return Vec::new();
        }
        self.limiter.mark(now);
        self.decide(state, power_available_w)
    }

    /// Policy of both axes without the rate limit
    pub fn decide(&self, state: &TelemetryState, power_available_w: i64) -> Vec<Command> {
        let mut commands = Vec::with_capacity(2);
        if let Some(level) = self.decide_current(state, power_available_w) {
            commands.push(Command::SetChargeCurrent(level));
        }
        if let Some(session) = decide_session(state, power_available_w) {
            commands.push(session);
        }
        commands
    }

    fn decide_current(
        &self,
        state: &TelemetryState,
        power_available_w: i64,
    ) -> Option<ChargeCurrent> {
        let mode = &state.max_charge_current;
        if self.reduced_forced {
            return (*mode != ChargeCurrentMode::Reduced).then_some(ChargeCurrent::Reduced);
        }
        if state.charging_state != ChargingState::Charging {
            return None;
        }
        if power_available_w > REDUCED_CHARGE_POWER_W {
            (*mode != ChargeCurrentMode::Maximum).then_some(ChargeCurrent::Maximum)
        } else if power_available_w < 0 {
            (*mode != ChargeCurrentMode::Reduced).then_some(ChargeCurrent::Reduced)
        } else {
            None
        }
    }
}

fn decide_session(state: &TelemetryState, power_available_w: i64) -> Option<Command> {
    match state.charging_state {
        ChargingState::ReadyForCharging if power_available_w > START_CHARGE_SURPLUS_W => {
            Some(Command::StartCharging)
        }
        ChargingState::Charging
            if power_available_w < STOP_CHARGE_DEFICIT_W
                && state.max_charge_current == ChargeCurrentMode::Reduced =>
        {
            Some(Command::StopCharging)
        }
        _ => None,
    }
}
