//! MQTT boundary of the controller
//!
//! The gateway exposes two independent capabilities:
//!
//! - [`MessageSource`]: one long-lived subscription connection that yields
//!   inbound telemetry and keepalive ticks, reconnecting after failures.
//! - [`CommandPublisher`]: a stateless one-shot publish. Every call opens its
//!   own connection, publishes, and disconnects, so command traffic never
//!   runs through the subscriber's event loop.
//!
//! Both are traits so the engine can be driven without a broker in tests.

use crate::config::MqttConfig;
use crate::error::{ChargeManagerError, Result};
use crate::logging::{StructuredLogger, get_logger};
use crate::topic::SUBSCRIPTION_FILTERS;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS, SubscribeFilter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::{sleep, timeout};

/// Capacity of the request channel between client handle and event loop
const REQUEST_CHANNEL_CAPACITY: usize = 10;

/// One inbound publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// What one wait on the subscription produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Telemetry message
    Message(InboundMessage),
    /// Keepalive round trip; no telemetry
    Tick,
    /// Connection failed; the next wait reconnects
    ConnectionLost(String),
}

/// Long-lived stream of inbound telemetry
#[async_trait::async_trait]
pub trait MessageSource: Send {
    /// Wait for the next transport event
    async fn next_event(&mut self) -> Result<TransportEvent>;

    /// Close the subscription; best effort
    async fn close(&mut self) {}
}

/// Fire-and-forget publish of one command
#[async_trait::async_trait]
pub trait CommandPublisher: Send + Sync {
    async fn publish(&self, topic: &str, payload: &str) -> Result<()>;
}

/// Map a configured QoS level to the client's type
pub fn qos_from_level(level: u8) -> QoS {
    match level {
        1 => QoS::AtLeastOnce,
        2 => QoS::ExactlyOnce,
        _ => QoS::AtMostOnce,
    }
}

/// Client id shared by all connections of this process
pub fn client_id_base() -> String {
    format!("chargemanager/{}", std::process::id())
}

fn mqtt_options(config: &MqttConfig, client_id: &str) -> MqttOptions {
    let mut options = MqttOptions::new(client_id, config.host.clone(), config.port);
    options.set_keep_alive(Duration::from_secs(config.keep_alive_secs.max(5)));
    options.set_clean_session(true);
    if let (Some(user), Some(password)) = (&config.user, &config.password) {
        options.set_credentials(user.clone(), password.clone());
    }
    options
}

/// Telemetry subscription over one persistent MQTT connection
pub struct MqttSubscription {
    client: AsyncClient,
    eventloop: EventLoop,
    qos: QoS,
    reconnect_delay: Duration,
    logger: StructuredLogger,
}

impl MqttSubscription {
    /// Prepare the connection; it is established by the first wait
    pub fn new(config: &MqttConfig, client_id: &str) -> Self {
        let (client, eventloop) =
            AsyncClient::new(mqtt_options(config, client_id), REQUEST_CHANNEL_CAPACITY);
        let logger = get_logger("subscriber");
        logger.debug(&format!(
            "Connecting ({}) to {}:{} with qos={}",
            client_id, config.host, config.port, config.qos
        ));
        Self {
            client,
            eventloop,
            qos: qos_from_level(config.qos),
            reconnect_delay: Duration::from_millis(config.reconnect_delay_ms),
            logger,
        }
    }

    fn subscribe_all(&self) -> Result<()> {
        let filters = SUBSCRIPTION_FILTERS
            .iter()
            .map(|f| SubscribeFilter::new((*f).to_string(), self.qos));
        self.client.try_subscribe_many(filters)?;
        for filter in SUBSCRIPTION_FILTERS {
            self.logger.debug(&format!("topic '{}' subscribed", filter));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl MessageSource for MqttSubscription {
    async fn next_event(&mut self) -> Result<TransportEvent> {
        loop {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    self.logger.info("MQTT broker connected");
                    // Clean sessions drop subscriptions, so renew on every connect
                    self.subscribe_all()?;
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    return Ok(TransportEvent::Message(InboundMessage {
                        topic: publish.topic,
                        payload: publish.payload.to_vec(),
                    }));
                }
                Ok(Event::Incoming(Packet::PingResp)) => return Ok(TransportEvent::Tick),
                Ok(_) => {}
                Err(e) => {
                    let reason = e.to_string();
                    self.logger.warn(&format!(
                        "MQTT connection error: {}; reconnecting in {:?}",
                        reason, self.reconnect_delay
                    ));
                    sleep(self.reconnect_delay).await;
                    return Ok(TransportEvent::ConnectionLost(reason));
                }
            }
        }
    }

    async fn close(&mut self) {
        if self.client.try_disconnect().is_err() {
            return;
        }
        // Flush the disconnect; give up quietly if the broker is gone
        let _ = timeout(Duration::from_secs(1), async {
            loop {
                match self.eventloop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        })
        .await;
    }
}

/// One connection per publish
pub struct MqttPublisher {
    config: MqttConfig,
    client_id_base: String,
    counter: AtomicU64,
    logger: StructuredLogger,
}

impl MqttPublisher {
    pub fn new(config: &MqttConfig, client_id_base: &str) -> Self {
        Self {
            config: config.clone(),
            client_id_base: client_id_base.to_string(),
            counter: AtomicU64::new(0),
            logger: get_logger("publisher"),
        }
    }

    async fn publish_once(
        &self,
        client: &AsyncClient,
        eventloop: &mut EventLoop,
        qos: QoS,
    ) -> Result<()> {
        // Wait until the broker has the message at the requested QoS
        loop {
            match eventloop.poll().await? {
                Event::Outgoing(Outgoing::Publish(_)) if qos == QoS::AtMostOnce => break,
                Event::Incoming(Packet::PubAck(_)) if qos == QoS::AtLeastOnce => break,
                Event::Incoming(Packet::PubComp(_)) => break,
                _ => {}
            }
        }

        client.try_disconnect()?;
        loop {
            match eventloop.poll().await {
                Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => return Ok(()),
                Ok(_) => {}
            }
        }
    }
}

#[async_trait::async_trait]
impl CommandPublisher for MqttPublisher {
    async fn publish(&self, topic: &str, payload: &str) -> Result<()> {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let client_id = format!("{}/pub-{}", self.client_id_base, n);
        let qos = qos_from_level(self.config.qos);

        self.logger.debug(&format!(
            "publish: cid->{} host->{} port->{} topic->{} payload->{} qos->{} retain->{}",
            client_id,
            self.config.host,
            self.config.port,
            topic,
            payload,
            self.config.qos,
            self.config.retain
        ));

        let (client, mut eventloop) = AsyncClient::new(
            mqtt_options(&self.config, &client_id),
            REQUEST_CHANNEL_CAPACITY,
        );
        client.try_publish(topic, qos, self.config.retain, payload.as_bytes().to_vec())?;

        let limit = Duration::from_secs(self.config.publish_timeout_secs.max(1));
        match timeout(limit, self.publish_once(&client, &mut eventloop, qos)).await {
            Ok(Ok(())) => {
                self.logger.debug("publish: successfully done");
                Ok(())
            }
            Ok(Err(e)) => {
                self.logger.debug(&format!("publish: error {}", e));
                Err(e)
            }
            Err(_) => {
                let msg = format!("publish to '{}' timed out after {:?}", topic, limit);
                self.logger.debug(&msg);
                Err(ChargeManagerError::timeout(msg))
            }
        }
    }
}
