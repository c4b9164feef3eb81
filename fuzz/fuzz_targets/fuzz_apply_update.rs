#![no_main]
use chargemanager::budget::PowerBudget;
use chargemanager::config::PolicyConfig;
use chargemanager::telemetry::{Signal, TelemetryState};
use chargemanager::topic::TopicDecoder;
use libfuzzer_sys::fuzz_target;

const SIGNALS: [Signal; 12] = [
    Signal::SolarPower,
    Signal::HomePower,
    Signal::GridPower,
    Signal::BatteryPower,
    Signal::BatterySoc,
    Signal::ChargingState,
    Signal::VehicleSoc,
    Signal::VehicleTargetSoc,
    Signal::CruisingRange,
    Signal::MaxChargeCurrent,
    Signal::PlugConnection,
    Signal::Odometer,
];

fuzz_target!(|data: &[u8]| {
    // Topic and payload are separated by the first NUL byte
    let (topic, payload) = match data.iter().position(|b| *b == 0) {
        Some(i) => (&data[..i], &data[i + 1..]),
        None => (data, &[][..]),
    };
    let topic = String::from_utf8_lossy(topic);

    let decoder = TopicDecoder::new("weconnect", "WVXZZZ12345678900");
    let budget = PowerBudget::from_policy(&PolicyConfig::default());
    let mut state = TelemetryState::new(true);

    if let Some((_, signal)) = decoder.decode(&topic) {
        state.apply_update(signal, payload);
    }
    for signal in SIGNALS {
        let before = state.clone();
        if !state.apply_update(signal, payload).is_valid() {
            assert_eq!(format!("{:?}", before), format!("{:?}", state));
        }
        let _ = budget.compute(&mut state);
    }
});
