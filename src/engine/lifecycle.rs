use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::dispatch::{Command, UPDATE_INTERVAL_DEFAULT_SECS, UPDATE_INTERVAL_FAST_SECS};
use crate::gateway::{MessageSource, TransportEvent};
use crate::stop::StopCondition;
use crate::telemetry::ChargingState;

use super::Flow;

/// Why the receive loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Stopped(StopCondition),
    Interrupted,
}

impl super::ChargeManager {
    /// Throttle the vehicle bridge to fast polling and set the target SoC
    pub async fn startup(&self) {
        self.logger.info(&self.config.summary());
        self.send(Command::SetUpdateInterval(UPDATE_INTERVAL_FAST_SECS))
            .await;
        self.send(Command::SetTargetSoc(self.config.policy.target_soc_pct))
            .await;
    }

    /// Restore slow polling and stop an active charge session
    pub async fn shutdown(&self) {
        self.send(Command::SetUpdateInterval(UPDATE_INTERVAL_DEFAULT_SECS))
            .await;
        if self.state.charging_state == ChargingState::Charging {
            self.send(Command::StopCharging).await;
        }
    }

    /// Drive the engine until a stop condition or cancellation.
    ///
    /// Runs startup housekeeping first and shutdown housekeeping last, on
    /// every exit path. Transport failures are never fatal; telemetry
    /// survives reconnects.
    pub async fn run<S>(&mut self, source: &mut S, cancel: CancellationToken) -> ExitReason
    where
        S: MessageSource + ?Sized,
    {
        self.startup().await;

        let reason = loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    self.logger.info("Program stopped by user.");
                    break ExitReason::Interrupted;
                }
                event = source.next_event() => event,
            };

            let flow = match event {
                Ok(TransportEvent::Message(message)) => {
                    self.handle_message(&message, Instant::now()).await
                }
                Ok(TransportEvent::Tick) => self.handle_tick(Instant::now()),
                Ok(TransportEvent::ConnectionLost(reason)) => {
                    self.logger
                        .debug(&format!("subscription interrupted: {}", reason));
                    self.handle_tick(Instant::now())
                }
                Err(e) => {
                    self.logger.warn(&format!("subscription error: {}", e));
                    self.handle_tick(Instant::now())
                }
            };

            if let Flow::Stop(condition) = flow {
                break ExitReason::Stopped(condition);
            }
        };

        source.close().await;
        self.shutdown().await;
        reason
    }
}
