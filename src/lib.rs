//! # chargemanager - surplus PV charging for an MQTT-bridged vehicle
//!
//! A reactive controller that decides whether a vehicle should charge, and
//! at which current level, from surplus photovoltaic production and the
//! house battery state. Everything is observed as MQTT telemetry and every
//! decision goes back to the vehicle bridge as an MQTT command.
//!
//! ## Architecture
//!
//! - `telemetry`: consolidated state of all observed signals
//! - `topic`: topic to signal decoding and control topic construction
//! - `budget`: power surplus calculation with the house battery hysteresis
//! - `stop`: terminal conditions of a charging session
//! - `dispatch`: rate-limited charge current and session decisions
//! - `gateway`: MQTT subscription and one-shot command publishing
//! - `engine`: the event loop tying everything together
//! - `config` / `cli`: YAML configuration with command line overrides
//! - `logging`: structured logging and tracing
//! - `error`: crate error type

pub mod budget;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod stop;
pub mod telemetry;
pub mod topic;

// Re-export commonly used types
pub use config::Config;
pub use engine::ChargeManager;
pub use error::{ChargeManagerError, Result};
