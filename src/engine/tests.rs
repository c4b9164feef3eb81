use super::*;
use crate::error::{ChargeManagerError, Result};
use crate::telemetry::PumpState;
use std::sync::Mutex;
use std::time::Duration;

const VIN: &str = "WVXZZZ12345678900";

#[derive(Default)]
struct RecordingPublisher {
    sent: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingPublisher {
    fn payloads_for(&self, topic: &str) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, p)| p.clone())
            .collect()
    }

    fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl CommandPublisher for RecordingPublisher {
    async fn publish(&self, topic: &str, payload: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((topic.to_string(), payload.to_string()));
        if self.fail {
            Err(ChargeManagerError::mqtt("broker unreachable"))
        } else {
            Ok(())
        }
    }
}

fn config() -> Config {
    let mut config = Config::default();
    config.vehicle.vin = VIN.to_string();
    config.policy.battery_max_discharge_watts = 4500;
    config
}

fn engine(publisher: Arc<RecordingPublisher>) -> ChargeManager {
    ChargeManager::new(config(), publisher)
}

fn vehicle(path: &str, payload: &str) -> InboundMessage {
    InboundMessage::new(
        format!("weconnect/vehicles/{VIN}/domains/{path}"),
        payload.as_bytes().to_vec(),
    )
}

fn pv(path: &str, payload: &str) -> InboundMessage {
    InboundMessage::new(format!("e3dc/{path}"), payload.as_bytes().to_vec())
}

#[tokio::test]
async fn pump_turns_on_at_high_house_soc() {
    let publisher = Arc::new(RecordingPublisher::default());
    let mut e = engine(publisher);
    let now = Instant::now();

    e.handle_message(&pv("home/power", "1000"), now).await;
    e.handle_message(&pv("battery/soc", "96"), now).await;
    e.handle_message(&pv("solar/power", "6000"), now).await;

    assert_eq!(e.state().pump, PumpState::On);
    assert_eq!(e.power_available_w(), 6000 - 1000 + 4500);
}

#[tokio::test]
async fn start_charging_once_per_window() {
    let publisher = Arc::new(RecordingPublisher::default());
    let mut e = engine(publisher.clone());
    let t0 = Instant::now();
    let charging_topic = e.topics().charging.clone();

    e.handle_message(
        &vehicle("charging/chargingStatus/chargingState", "readyForCharging"),
        t0,
    )
    .await;
    // window consumed without surplus
    assert!(publisher.payloads_for(&charging_topic).is_empty());

    let later = t0 + Duration::from_secs(11);
    e.handle_message(&pv("home/power", "0"), later).await;
    e.handle_message(&pv("solar/power", "6000"), later).await;
    e.handle_message(&pv("solar/power", "6000"), later + Duration::from_secs(1))
        .await;
    assert_eq!(publisher.payloads_for(&charging_topic), vec!["start"]);

    e.handle_message(&pv("solar/power", "6000"), later + Duration::from_secs(12))
        .await;
    assert_eq!(publisher.payloads_for(&charging_topic), vec!["start", "start"]);
}

#[tokio::test]
async fn stop_charging_on_deficit_in_reduced_mode() {
    let publisher = Arc::new(RecordingPublisher::default());
    let mut e = engine(publisher.clone());
    let now = Instant::now();

    e.handle_message(&pv("battery/soc", "50"), now).await;
    e.handle_message(&pv("home/power", "1300"), now).await;
    e.handle_message(
        &vehicle("charging/chargingSettings/maxChargeCurrentAC", "reduced"),
        now,
    )
    .await;
    e.handle_message(&vehicle("charging/chargingStatus/chargingState", "charging"), now)
        .await;
    // first significant update consumed the window with no solar yet
    e.handle_message(&pv("solar/power", "1000"), now + Duration::from_secs(11))
        .await;

    assert_eq!(e.power_available_w(), -300);
    assert_eq!(publisher.payloads_for(&e.topics().charging.clone()), vec!["stop"]);
}

#[tokio::test]
async fn zero_solar_stops_regardless_of_other_state() {
    let publisher = Arc::new(RecordingPublisher::default());
    let mut e = engine(publisher.clone());
    let now = Instant::now();

    e.handle_message(&vehicle("charging/chargingStatus/chargingState", "charging"), now)
        .await;
    let before = publisher.count();
    let flow = e.handle_message(&pv("solar/power", "0"), now).await;
    assert_eq!(flow, Flow::Stop(StopCondition::NoSolarProduction));
    assert_eq!(publisher.count(), before);
}

#[tokio::test]
async fn odometer_movement_stops_exactly_on_increase() {
    let publisher = Arc::new(RecordingPublisher::default());
    let mut e = engine(publisher);
    let now = Instant::now();
    let odo = |km: &str| vehicle("measurements/odometerStatus/odometer", km);

    assert_eq!(e.handle_message(&odo("100"), now).await, Flow::Continue);
    assert_eq!(e.handle_message(&odo("100"), now).await, Flow::Continue);
    assert_eq!(e.handle_message(&odo("100"), now).await, Flow::Continue);
    assert_eq!(
        e.handle_message(&odo("105"), now).await,
        Flow::Stop(StopCondition::VehicleMoving { odometer_km: 105 })
    );
}

#[tokio::test]
async fn malformed_payload_keeps_state_and_running() {
    let publisher = Arc::new(RecordingPublisher::default());
    let mut e = engine(publisher.clone());
    let now = Instant::now();

    e.handle_message(&pv("solar/power", "4000"), now).await;
    let flow = e.handle_message(&pv("solar/power", "n/a"), now).await;
    assert_eq!(flow, Flow::Continue);
    assert_eq!(e.state().solar_power_w, Some(4000));
}

#[tokio::test]
async fn runtime_budget_expires_on_tick() {
    let publisher = Arc::new(RecordingPublisher::default());
    let mut e = engine(publisher);
    let t0 = Instant::now();

    assert_eq!(e.handle_tick(t0 + Duration::from_secs(100_000)), Flow::Continue);
    e.handle_message(&pv("grid/power", "0"), t0).await;
    assert_eq!(e.handle_tick(t0 + Duration::from_secs(8 * 3600)), Flow::Continue);
    assert_eq!(
        e.handle_tick(t0 + Duration::from_secs(8 * 3600 + 1)),
        Flow::Stop(StopCondition::RuntimeExpired)
    );
}

#[tokio::test]
async fn startup_and_shutdown_housekeeping() {
    let publisher = Arc::new(RecordingPublisher::default());
    let mut e = engine(publisher.clone());
    let topics = e.topics().clone();

    e.startup().await;
    assert_eq!(publisher.payloads_for(&topics.update_interval), vec!["10"]);
    assert_eq!(publisher.payloads_for(&topics.target_soc), vec!["80"]);

    e.handle_message(
        &vehicle("charging/chargingStatus/chargingState", "charging"),
        Instant::now(),
    )
    .await;
    e.shutdown().await;
    assert_eq!(
        publisher.payloads_for(&topics.update_interval),
        vec!["10", "300"]
    );
    assert_eq!(publisher.payloads_for(&topics.charging), vec!["stop"]);
}

#[tokio::test]
async fn publish_failures_are_not_fatal() {
    let publisher = Arc::new(RecordingPublisher {
        fail: true,
        ..Default::default()
    });
    let mut e = engine(publisher.clone());
    e.startup().await;
    let flow = e
        .handle_message(
            &vehicle("charging/chargingStatus/chargingState", "readyForCharging"),
            Instant::now(),
        )
        .await;
    assert_eq!(flow, Flow::Continue);
    assert_eq!(publisher.count(), 2);
}

#[test]
fn snapshot_status_line_marks_unknown_values() {
    let publisher = Arc::new(RecordingPublisher::default());
    let e = engine(publisher);
    let snap = e.snapshot();
    assert_eq!(
        snap.status_line(),
        "SOC=-(-) Range=-km surplus=0W State: unknown unknown"
    );
    let json = serde_json::to_value(&snap).unwrap();
    assert_eq!(json["battery_soc_pct"], 80);
}
