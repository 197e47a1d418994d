//! MQTT broker adapter.
//!
//! Implements [`BrokerPort`].  Inbound messages arrive on the client's
//! event task; they are copied into an `embassy-sync` channel and drained
//! by the main loop through [`take_message`](BrokerPort::take_message).
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::mqtt::client::EspMqttClient`.
//! - **all other targets**: an in-memory broker with injection hooks.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::info;

use crate::app::ports::{BrokerMessage, BrokerPort};
use crate::error::CommsError;

/// Inbound messages buffered between two loop passes.
pub const INBOX_DEPTH: usize = 8;

pub type Inbox = Channel<CriticalSectionRawMutex, BrokerMessage, INBOX_DEPTH>;

type Host = heapless::String<64>;

// ───────────────────────────────────────────────────────────────
// ESP-IDF client
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
static INBOX: Inbox = Inbox::new();

#[cfg(target_os = "espidf")]
pub struct MqttAdapter {
    host: Host,
    port: u16,
    client: Option<esp_idf_svc::mqtt::client::EspMqttClient<'static>>,
    connected: std::sync::Arc<core::sync::atomic::AtomicBool>,
}

#[cfg(target_os = "espidf")]
impl Default for MqttAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "espidf")]
impl MqttAdapter {
    pub fn new() -> Self {
        Self {
            host: Host::new(),
            port: 0,
            client: None,
            connected: std::sync::Arc::new(core::sync::atomic::AtomicBool::new(false)),
        }
    }
}

#[cfg(target_os = "espidf")]
impl BrokerPort for MqttAdapter {
    fn configure(&mut self, host: &str, port: u16) {
        self.host = crate::text::bounded(host);
        self.port = port;
        self.disconnect();
    }

    /// Returns once the client is created; the CONNACK shows up later in
    /// [`is_connected`](BrokerPort::is_connected).  While a client exists
    /// the ESP-IDF task keeps retrying on its own, so repeated calls leave
    /// it alone.
    fn connect(&mut self, client_id: &str, user: &str, password: &str) -> Result<(), CommsError> {
        use core::sync::atomic::Ordering;
        use esp_idf_svc::mqtt::client::{EspMqttClient, EventPayload, MqttClientConfiguration};

        if self.client.is_some() {
            return Ok(());
        }
        self.connected.store(false, Ordering::Release);

        let url = format!("mqtt://{}:{}", self.host, self.port);
        let conf = MqttClientConfiguration {
            client_id: Some(client_id),
            username: Some(user),
            password: Some(password),
            ..Default::default()
        };

        let flag = self.connected.clone();
        let client = EspMqttClient::new_cb(&url, &conf, move |event| match event.payload() {
            EventPayload::Connected(_) => flag.store(true, Ordering::Release),
            EventPayload::Disconnected => flag.store(false, Ordering::Release),
            EventPayload::Received { topic, data, .. } => {
                let msg = BrokerMessage::new(topic.unwrap_or(""), data);
                if INBOX.try_send(msg).is_err() {
                    log::warn!("MQTT: inbox full, message dropped");
                }
            }
            _ => {}
        })
        .map_err(|e| {
            log::warn!("MQTT: client init for {url} failed: {e}");
            CommsError::MqttConnectFailed
        })?;
        self.client = Some(client);
        info!("MQTT: connecting to {url} as '{client_id}'");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.client.is_some() && self.connected.load(core::sync::atomic::Ordering::Acquire)
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), CommsError> {
        use esp_idf_svc::mqtt::client::QoS;

        let client = self.client.as_mut().ok_or(CommsError::MqttSubscribeFailed)?;
        client.subscribe(topic, QoS::AtMostOnce).map_err(|e| {
            log::warn!("MQTT: subscribe '{topic}' failed: {e}");
            CommsError::MqttSubscribeFailed
        })?;
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), CommsError> {
        use esp_idf_svc::mqtt::client::QoS;

        let client = self.client.as_mut().ok_or(CommsError::MqttPublishFailed)?;
        client
            .publish(topic, QoS::AtMostOnce, false, payload)
            .map_err(|e| {
                log::warn!("MQTT: publish '{topic}' failed: {e}");
                CommsError::MqttPublishFailed
            })?;
        Ok(())
    }

    fn disconnect(&mut self) {
        if self.client.take().is_some() {
            info!("MQTT: session closed");
        }
        self.connected
            .store(false, core::sync::atomic::Ordering::Release);
    }

    fn take_message(&mut self) -> Option<BrokerMessage> {
        INBOX.try_receive().ok()
    }
}

// ───────────────────────────────────────────────────────────────
// Simulation
// ───────────────────────────────────────────────────────────────

/// Host-side broker.  Connects while reachable; records publishes and
/// delivers injected messages only for subscribed topics.
#[cfg(not(target_os = "espidf"))]
pub struct MqttAdapter {
    host: Host,
    port: u16,
    reachable: bool,
    connected: bool,
    subscriptions: Vec<Host>,
    published: Vec<BrokerMessage>,
    inbox: Inbox,
}

#[cfg(not(target_os = "espidf"))]
impl Default for MqttAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(target_os = "espidf"))]
impl MqttAdapter {
    pub fn new() -> Self {
        Self {
            host: Host::new(),
            port: 0,
            reachable: true,
            connected: false,
            subscriptions: Vec::new(),
            published: Vec::new(),
            inbox: Inbox::new(),
        }
    }

    pub fn set_reachable(&mut self, reachable: bool) {
        self.reachable = reachable;
    }

    /// Simulate the broker dropping the session.
    pub fn drop_session(&mut self) {
        self.connected = false;
        self.subscriptions.clear();
    }

    /// Deliver `payload` as if the broker pushed it.  Returns `false` when
    /// the topic is not subscribed or the inbox is full.
    pub fn inject(&self, topic: &str, payload: &[u8]) -> bool {
        if !self.connected || !self.subscriptions.iter().any(|t| t == topic) {
            return false;
        }
        self.inbox.try_send(BrokerMessage::new(topic, payload)).is_ok()
    }

    pub fn published(&self) -> &[BrokerMessage] {
        &self.published
    }

    pub fn endpoint(&self) -> (&str, u16) {
        (&self.host, self.port)
    }
}

#[cfg(not(target_os = "espidf"))]
impl BrokerPort for MqttAdapter {
    fn configure(&mut self, host: &str, port: u16) {
        self.host = crate::text::bounded(host);
        self.port = port;
    }

    fn connect(&mut self, client_id: &str, _user: &str, _password: &str) -> Result<(), CommsError> {
        if !self.reachable || self.host.is_empty() {
            return Err(CommsError::MqttConnectFailed);
        }
        self.connected = true;
        self.subscriptions.clear();
        info!("MQTT(sim): '{}' connected to {}:{}", client_id, self.host, self.port);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), CommsError> {
        if !self.connected {
            return Err(CommsError::MqttSubscribeFailed);
        }
        self.subscriptions.push(crate::text::bounded(topic));
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), CommsError> {
        if !self.connected {
            return Err(CommsError::MqttPublishFailed);
        }
        self.published.push(BrokerMessage::new(topic, payload));
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
        self.subscriptions.clear();
    }

    fn take_message(&mut self) -> Option<BrokerMessage> {
        self.inbox.try_receive().ok()
    }
}
