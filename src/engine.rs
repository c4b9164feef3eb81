//! Event-driven decision engine
//!
//! Every inbound message runs the same sequence: decode the topic, update
//! the telemetry state, check the stop conditions, recompute the surplus,
//! and let the dispatcher decide on commands. Nothing runs between messages
//! except keepalive ticks, which only check the runtime budget.
//!
//! All mutation happens sequentially inside [`ChargeManager::handle_message`];
//! command publishes go through the [`CommandPublisher`] capability and are
//! awaited in line, which keeps command issuance serialized.

use crate::budget::PowerBudget;
use crate::config::Config;
use crate::dispatch::{Command, Dispatcher};
use crate::gateway::{CommandPublisher, InboundMessage};
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use crate::stop::{StopCondition, StopEvaluator};
use crate::telemetry::{TelemetryState, UpdateOutcome};
use crate::topic::{ControlTopics, TopicDecoder};
use std::sync::Arc;
use std::time::Instant;

mod lifecycle;
mod snapshot;

#[cfg(test)]
mod tests;

pub use lifecycle::ExitReason;
pub use snapshot::StatusSnapshot;

/// Whether the receive loop keeps going after a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop(StopCondition),
}

/// The charging controller for one vehicle
pub struct ChargeManager {
    config: Config,
    topics: ControlTopics,
    decoder: TopicDecoder,
    state: TelemetryState,
    budget: PowerBudget,
    stop: StopEvaluator,
    dispatcher: Dispatcher,
    publisher: Arc<dyn CommandPublisher>,
    power_available_w: i64,
    last_status_line: Option<String>,
    logger: StructuredLogger,
}

impl ChargeManager {
    /// Build the engine from a normalized, validated configuration
    pub fn new(config: Config, publisher: Arc<dyn CommandPublisher>) -> Self {
        let vehicle = &config.vehicle;
        let policy = &config.policy;
        let logger = get_logger_with_context(LogContext::new("engine").with_vin(&vehicle.vin));

        Self {
            topics: ControlTopics::new(&vehicle.prefix, &vehicle.vin),
            decoder: TopicDecoder::new(&vehicle.prefix, &vehicle.vin),
            state: TelemetryState::new(policy.hysteresis_enabled),
            budget: PowerBudget::from_policy(policy),
            stop: StopEvaluator::new(policy.runtime_hours),
            dispatcher: Dispatcher::new(policy.reduced),
            publisher,
            power_available_w: 0,
            last_status_line: None,
            logger,
            config,
        }
    }

    /// Replace the dispatcher, e.g. to shorten the rate-limit interval
    pub fn with_dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> &TelemetryState {
        &self.state
    }

    pub fn topics(&self) -> &ControlTopics {
        &self.topics
    }

    /// Surplus computed for the last processed message
    pub fn power_available_w(&self) -> i64 {
        self.power_available_w
    }

    /// Process one inbound message
    pub async fn handle_message(&mut self, message: &InboundMessage, now: Instant) -> Flow {
        self.stop.start_session(now);

        self.logger.debug(&format!(
            ">{}< >{}<",
            message.topic,
            String::from_utf8_lossy(&message.payload)
        ));

        let significant = match self.decoder.decode(&message.topic) {
            Some((_, signal)) => {
                let outcome = self.state.apply_update(signal, &message.payload);
                if outcome == UpdateOutcome::Invalid {
                    self.logger.debug(&format!(
                        "Rejected malformed payload for {:?} on '{}'",
                        signal, message.topic
                    ));
                }
                signal.is_significant() && outcome.is_valid()
            }
            None => false,
        };

        if let Some(condition) = self.stop.check(&self.state, now) {
            self.logger
                .info(&format!("Stop program because {}.", condition));
            return Flow::Stop(condition);
        }

        self.power_available_w = self.budget.compute(&mut self.state);
        self.log_status();

        let commands =
            self.dispatcher
                .evaluate(&self.state, self.power_available_w, significant, now);
        for command in commands {
            self.send(command).await;
        }

        Flow::Continue
    }

    /// Keepalive tick or reconnect attempt without telemetry
    pub fn handle_tick(&self, now: Instant) -> Flow {
        self.logger.trace("keepalive tick");
        match self.stop.check_runtime(now) {
            Some(condition) => {
                self.logger
                    .info(&format!("Stop program because {}.", condition));
                Flow::Stop(condition)
            }
            None => Flow::Continue,
        }
    }

    /// Publish one command; failures are logged, never retried
    pub(crate) async fn send(&self, command: Command) {
        let topic = command.topic(&self.topics);
        let payload = command.payload();
        match self.publisher.publish(topic, &payload).await {
            Ok(()) => self.logger.info(&format!("published: {}", command)),
            Err(e) => self
                .logger
                .debug(&format!("publishing '{}' failed: {}", command, e)),
        }
    }

    fn log_status(&mut self) {
        let line = self.snapshot().status_line();
        if self.last_status_line.as_deref() != Some(line.as_str()) {
            self.logger.info(&line);
            self.last_status_line = Some(line);
        }
    }
}
