//! Consolidated telemetry state
//!
//! Holds the latest known value of every observed signal: house PV values
//! from the inverter bridge and vehicle values from the vehicle bridge.
//! Updates arrive as raw MQTT payloads; each signal has one decode rule and
//! malformed payloads leave the state untouched.

use serde::Serialize;
use std::fmt;

/// Enumerated payloads longer than this are rejected
pub const MAX_ENUM_PAYLOAD_LEN: usize = 19;

/// House battery SoC assumed until the first reading arrives
pub const BATTERY_SOC_INITIAL: i64 = 80;

/// Every signal the controller observes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Signal {
    SolarPower,
    HomePower,
    GridPower,
    BatteryPower,
    BatterySoc,
    ChargingState,
    VehicleSoc,
    VehicleTargetSoc,
    CruisingRange,
    MaxChargeCurrent,
    PlugConnection,
    Odometer,
}

impl Signal {
    /// Whether a valid update of this signal may trigger command dispatch
    pub fn is_significant(self) -> bool {
        matches!(self, Signal::SolarPower | Signal::ChargingState)
    }
}

/// Result of applying one raw payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Payload decoded and the stored value changed
    Changed,
    /// Payload decoded but equals the stored value
    Unchanged,
    /// Payload rejected; state not modified
    Invalid,
}

impl UpdateOutcome {
    pub fn is_valid(self) -> bool {
        self != UpdateOutcome::Invalid
    }
}

/// Charging state reported by the vehicle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub enum ChargingState {
    #[default]
    Unknown,
    ReadyForCharging,
    Charging,
    Other(String),
}

impl ChargingState {
    fn decode(value: &str) -> Self {
        match value {
            "readyForCharging" => ChargingState::ReadyForCharging,
            "charging" => ChargingState::Charging,
            other => ChargingState::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ChargingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChargingState::Unknown => f.write_str("unknown"),
            ChargingState::ReadyForCharging => f.write_str("readyForCharging"),
            ChargingState::Charging => f.write_str("charging"),
            ChargingState::Other(s) => f.write_str(s),
        }
    }
}

/// Maximum AC charge current setting of the vehicle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub enum ChargeCurrentMode {
    #[default]
    Unknown,
    Reduced,
    Maximum,
    Other(String),
}

impl ChargeCurrentMode {
    fn decode(value: &str) -> Self {
        match value {
            "reduced" => ChargeCurrentMode::Reduced,
            "maximum" => ChargeCurrentMode::Maximum,
            other => ChargeCurrentMode::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ChargeCurrentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChargeCurrentMode::Unknown => f.write_str("unknown"),
            ChargeCurrentMode::Reduced => f.write_str("reduced"),
            ChargeCurrentMode::Maximum => f.write_str("maximum"),
            ChargeCurrentMode::Other(s) => f.write_str(s),
        }
    }
}

/// Plug connection state of the vehicle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub enum PlugState {
    #[default]
    Unknown,
    Connected,
    Disconnected,
    Other(String),
}

impl PlugState {
    fn decode(value: &str) -> Self {
        match value {
            "connected" => PlugState::Connected,
            "disconnected" => PlugState::Disconnected,
            other => PlugState::Other(other.to_string()),
        }
    }
}

/// Whether the house battery currently supports vehicle charging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PumpState {
    Off,
    On,
    /// Hysteresis switched off by configuration
    Disabled,
}

/// Latest known value of every observed signal
#[derive(Debug, Clone, Serialize)]
pub struct TelemetryState {
    /// PV production; `None` until the first reading
    pub solar_power_w: Option<i64>,
    pub home_power_w: i64,
    pub grid_power_w: i64,
    pub battery_power_w: i64,
    pub battery_soc_pct: i64,

    pub charging_state: ChargingState,
    pub vehicle_soc_pct: Option<i64>,
    pub vehicle_target_soc_pct: Option<i64>,
    pub cruising_range_km: Option<i64>,
    pub max_charge_current: ChargeCurrentMode,

    pub plug: PlugState,
    /// Set by the first `connected` observation and never cleared
    pub plug_seen_connected: bool,

    /// First odometer reading of the session
    pub odometer_baseline_km: Option<i64>,
    pub odometer_km: Option<i64>,

    pub pump: PumpState,
}

impl TelemetryState {
    /// Fresh state with sentinel values
    pub fn new(hysteresis_enabled: bool) -> Self {
        Self {
            solar_power_w: None,
            home_power_w: 0,
            grid_power_w: 0,
            battery_power_w: 0,
            battery_soc_pct: BATTERY_SOC_INITIAL,
            charging_state: ChargingState::Unknown,
            vehicle_soc_pct: None,
            vehicle_target_soc_pct: None,
            cruising_range_km: None,
            max_charge_current: ChargeCurrentMode::Unknown,
            plug: PlugState::Unknown,
            plug_seen_connected: false,
            odometer_baseline_km: None,
            odometer_km: None,
            pump: if hysteresis_enabled {
                PumpState::Off
            } else {
                PumpState::Disabled
            },
        }
    }

    /// Whether the plug is connected right now
    pub fn plug_connected(&self) -> bool {
        self.plug == PlugState::Connected
    }

    /// Decode `payload` for `signal` and store it
    pub fn apply_update(&mut self, signal: Signal, payload: &[u8]) -> UpdateOutcome {
        let Ok(text) = std::str::from_utf8(payload) else {
            return UpdateOutcome::Invalid;
        };
        let text = text.trim();

        match signal {
            Signal::SolarPower => update_optional_integer(&mut self.solar_power_w, text),
            Signal::HomePower => update_integer(&mut self.home_power_w, text),
            Signal::GridPower => update_integer(&mut self.grid_power_w, text),
            Signal::BatteryPower => update_integer(&mut self.battery_power_w, text),
            Signal::BatterySoc => update_integer(&mut self.battery_soc_pct, text),
            Signal::VehicleSoc => update_optional_integer(&mut self.vehicle_soc_pct, text),
            Signal::VehicleTargetSoc => {
                update_optional_integer(&mut self.vehicle_target_soc_pct, text)
            }
            Signal::CruisingRange => update_optional_integer(&mut self.cruising_range_km, text),
            Signal::ChargingState => match parse_enumerated(text) {
                Some(v) => store(&mut self.charging_state, ChargingState::decode(v)),
                None => UpdateOutcome::Invalid,
            },
            Signal::MaxChargeCurrent => match parse_enumerated(text) {
                Some(v) => store(&mut self.max_charge_current, ChargeCurrentMode::decode(v)),
                None => UpdateOutcome::Invalid,
            },
            Signal::PlugConnection => match parse_enumerated(text) {
                Some(v) => {
                    let plug = PlugState::decode(v);
                    if plug == PlugState::Connected {
                        self.plug_seen_connected = true;
                    }
                    store(&mut self.plug, plug)
                }
                None => UpdateOutcome::Invalid,
            },
            Signal::Odometer => match parse_integer(text) {
                Some(km) => {
                    if self.odometer_baseline_km.is_none() {
                        self.odometer_baseline_km = Some(km);
                    }
                    store(&mut self.odometer_km, Some(km))
                }
                None => UpdateOutcome::Invalid,
            },
        }
    }
}

fn store<T: PartialEq>(slot: &mut T, value: T) -> UpdateOutcome {
    if *slot == value {
        UpdateOutcome::Unchanged
    } else {
        *slot = value;
        UpdateOutcome::Changed
    }
}

fn update_integer(slot: &mut i64, text: &str) -> UpdateOutcome {
    match parse_integer(text) {
        Some(v) => store(slot, v),
        None => UpdateOutcome::Invalid,
    }
}

fn update_optional_integer(slot: &mut Option<i64>, text: &str) -> UpdateOutcome {
    match parse_integer(text) {
        Some(v) => store(slot, Some(v)),
        None => UpdateOutcome::Invalid,
    }
}

/// Integer payload; finite decimal readings are truncated toward zero
fn parse_integer(text: &str) -> Option<i64> {
    if let Ok(v) = text.parse::<i64>() {
        return Some(v);
    }
    let v = text.parse::<f64>().ok().filter(|v| v.is_finite())?;
    let whole = v.trunc();
    if whole.abs() < i64::MAX as f64 {
        Some(whole as i64)
    } else {
        None
    }
}

fn parse_enumerated(text: &str) -> Option<&str> {
    if text.is_empty() || text.len() > MAX_ENUM_PAYLOAD_LEN {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_uses_sentinels() {
        let state = TelemetryState::new(true);
        assert_eq!(state.solar_power_w, None);
        assert_eq!(state.battery_soc_pct, 80);
        assert_eq!(state.charging_state, ChargingState::Unknown);
        assert_eq!(state.pump, PumpState::Off);
        assert_eq!(TelemetryState::new(false).pump, PumpState::Disabled);
    }

    #[test]
    fn integer_signals_report_change() {
        let mut state = TelemetryState::new(true);
        assert_eq!(
            state.apply_update(Signal::SolarPower, b"6000"),
            UpdateOutcome::Changed
        );
        assert_eq!(
            state.apply_update(Signal::SolarPower, b"6000"),
            UpdateOutcome::Unchanged
        );
        assert_eq!(state.solar_power_w, Some(6000));

        assert_eq!(
            state.apply_update(Signal::GridPower, b"-1200"),
            UpdateOutcome::Changed
        );
        assert_eq!(state.grid_power_w, -1200);
    }

    #[test]
    fn decimal_readings_are_truncated() {
        let mut state = TelemetryState::new(true);
        state.apply_update(Signal::HomePower, b" 812.6\n");
        assert_eq!(state.home_power_w, 812);

        state.apply_update(Signal::GridPower, b"-250.9");
        assert_eq!(state.grid_power_w, -250);
    }

    #[test]
    fn malformed_payloads_leave_state_untouched() {
        let mut state = TelemetryState::new(true);
        state.apply_update(Signal::SolarPower, b"4200");

        let payloads: [&[u8]; 6] = [b"abc", b"", b"12kW", b"NaN", b"inf", &[0xff, 0xfe]];
        for payload in payloads {
            assert_eq!(
                state.apply_update(Signal::SolarPower, payload),
                UpdateOutcome::Invalid
            );
        }
        assert_eq!(state.solar_power_w, Some(4200));
    }

    #[test]
    fn enumerated_payloads_are_length_checked() {
        let mut state = TelemetryState::new(true);
        assert_eq!(
            state.apply_update(Signal::ChargingState, b"charging"),
            UpdateOutcome::Changed
        );
        assert_eq!(
            state.apply_update(Signal::ChargingState, b"aVeryLongChargingStateValue"),
            UpdateOutcome::Invalid
        );
        assert_eq!(
            state.apply_update(Signal::ChargingState, b""),
            UpdateOutcome::Invalid
        );
        assert_eq!(state.charging_state, ChargingState::Charging);
    }

    #[test]
    fn unknown_enumerations_are_kept_verbatim() {
        let mut state = TelemetryState::new(true);
        state.apply_update(Signal::ChargingState, b"error");
        assert_eq!(state.charging_state, ChargingState::Other("error".into()));
        assert_eq!(state.charging_state.to_string(), "error");

        state.apply_update(Signal::MaxChargeCurrent, b"invalid");
        assert_eq!(
            state.max_charge_current,
            ChargeCurrentMode::Other("invalid".into())
        );
    }

    #[test]
    fn plug_connection_is_remembered() {
        let mut state = TelemetryState::new(true);
        state.apply_update(Signal::PlugConnection, b"disconnected");
        assert!(!state.plug_seen_connected);

        state.apply_update(Signal::PlugConnection, b"connected");
        assert!(state.plug_connected());
        state.apply_update(Signal::PlugConnection, b"disconnected");
        assert!(!state.plug_connected());
        assert!(state.plug_seen_connected);
    }

    #[test]
    fn first_odometer_reading_becomes_baseline() {
        let mut state = TelemetryState::new(true);
        state.apply_update(Signal::Odometer, b"100");
        state.apply_update(Signal::Odometer, b"105");
        assert_eq!(state.odometer_baseline_km, Some(100));
        assert_eq!(state.odometer_km, Some(105));
    }

    #[test]
    fn significance_is_limited_to_solar_and_charging_state() {
        assert!(Signal::SolarPower.is_significant());
        assert!(Signal::ChargingState.is_significant());
        assert!(!Signal::BatterySoc.is_significant());
        assert!(!Signal::MaxChargeCurrent.is_significant());
        assert!(!Signal::Odometer.is_significant());
    }
}
