use chargemanager::budget::PowerBudget;
use chargemanager::config::PolicyConfig;
use chargemanager::telemetry::{PumpState, Signal, TelemetryState};

fn budget() -> PowerBudget {
    PowerBudget::from_policy(&PolicyConfig {
        battery_reserve_watts: 500,
        battery_max_discharge_watts: 4500,
        ..PolicyConfig::default()
    })
}

fn feed(state: &mut TelemetryState, budget: &PowerBudget, soc: i64) -> (PumpState, i64) {
    state.apply_update(Signal::BatterySoc, soc.to_string().as_bytes());
    let power = budget.compute(state);
    (state.pump, power)
}

#[test]
fn pump_follows_soc_sequence_with_hysteresis() {
    let budget = budget();
    let mut state = TelemetryState::new(true);
    state.apply_update(Signal::SolarPower, b"6000");
    state.apply_update(Signal::HomePower, b"1000");

    let expected = [
        (90, PumpState::Off, 4500),
        (95, PumpState::On, 9500),
        (90, PumpState::On, 9500),
        (85, PumpState::On, 9500),
        (84, PumpState::Off, 4500),
        (94, PumpState::Off, 4500),
    ];
    for (soc, pump, power) in expected {
        assert_eq!(feed(&mut state, &budget, soc), (pump, power), "soc={}", soc);
    }
}

#[test]
fn disabled_hysteresis_always_lets_the_battery_help() {
    let budget = budget();
    let mut state = TelemetryState::new(false);
    state.apply_update(Signal::SolarPower, b"2000");
    state.apply_update(Signal::HomePower, b"500");

    for soc in [0, 50, 100] {
        assert_eq!(feed(&mut state, &budget, soc), (PumpState::Disabled, 6000));
    }
}

#[test]
fn no_known_production_means_no_surplus() {
    let budget = budget();
    let mut state = TelemetryState::new(true);
    state.apply_update(Signal::BatterySoc, b"99");
    assert_eq!(budget.compute(&mut state), 0);
    // pump does not advance without production
    assert_eq!(state.pump, PumpState::Off);
}
