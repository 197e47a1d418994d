//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Radios, storage and the clock are reached only through these traits.
//! [`AppService`](super::service::AppService) consumes them via generics, so
//! the mode logic never touches ESP-IDF directly and runs unchanged against
//! the host simulations and the integration-test mocks.
//!
//! ## Callback discipline
//!
//! BLE writes and broker messages arrive on ESP-IDF tasks.  Adapters MUST
//! queue them and hand them out through [`ProvisioningPort::take_write`] and
//! [`BrokerPort::take_message`]; the domain drains them from the main loop.

use heapless::{String, Vec};

use crate::config::SystemConfig;
use crate::error::CommsError;
use crate::provisioning::FieldWrite;

/// Longest topic accepted from the broker.
pub const MAX_TOPIC_LEN: usize = 64;
/// Longest inbound payload kept; the tail of longer payloads is dropped.
pub const MAX_PAYLOAD_LEN: usize = 128;

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Network port (driven adapter: domain → Wi-Fi station)
// ───────────────────────────────────────────────────────────────

/// Wi-Fi station join.  Every call returns immediately; progress is observed
/// by polling [`is_connected`](Self::is_connected).
pub trait NetworkPort {
    /// Put the radio into station mode.
    fn set_station_mode(&mut self) -> Result<(), CommsError>;

    /// Begin joining `name`.  Does not wait for the association.
    fn begin(&mut self, name: &str, secret: &str) -> Result<(), CommsError>;

    /// `true` once the link is associated and has an address.
    fn is_connected(&self) -> bool;

    /// Drop the link and power the radio down.
    fn disconnect(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Broker port (driven adapter: domain ↔ MQTT)
// ───────────────────────────────────────────────────────────────

/// One inbound broker message, copied out of the transport callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerMessage {
    pub topic: String<MAX_TOPIC_LEN>,
    pub payload: Vec<u8, MAX_PAYLOAD_LEN>,
}

impl BrokerMessage {
    /// Copy a message, truncating the topic and payload to their bounds.
    pub fn new(topic: &str, payload: &[u8]) -> Self {
        let payload = &payload[..payload.len().min(MAX_PAYLOAD_LEN)];
        Self {
            topic: crate::text::bounded(topic),
            payload: Vec::from_slice(payload).unwrap_or_default(),
        }
    }
}

/// Publish/subscribe session with the message broker.
pub trait BrokerPort {
    /// Set the server for subsequent connects.
    fn configure(&mut self, host: &str, port: u16);

    /// One connect attempt with the fixed client identity.
    fn connect(&mut self, client_id: &str, user: &str, password: &str) -> Result<(), CommsError>;

    fn is_connected(&self) -> bool;

    fn subscribe(&mut self, topic: &str) -> Result<(), CommsError>;

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), CommsError>;

    fn disconnect(&mut self);

    /// Next message queued by the transport callback, oldest first.
    fn take_message(&mut self) -> Option<BrokerMessage>;
}

// ───────────────────────────────────────────────────────────────
// Provisioning port (driven adapter: domain ↔ BLE GATT)
// ───────────────────────────────────────────────────────────────

/// Values exposed for read-back when the GATT server starts.
#[derive(Debug, Clone, Copy)]
pub struct AttributeSeed<'a> {
    pub device_name: &'a str,
    pub network_name: &'a str,
    pub network_secret: &'a str,
    pub broker_host: &'a str,
}

/// Short-range provisioning link.
pub trait ProvisioningPort {
    /// Bring the radio up, register the credential attributes and advertise.
    fn start(&mut self, seed: &AttributeSeed<'_>) -> Result<(), CommsError>;

    /// Stop advertising, drop peers and release the radio.
    fn stop(&mut self);

    fn is_active(&self) -> bool;

    /// Next credential write received from a peer, oldest first.
    fn take_write(&mut self) -> Option<FieldWrite>;
}

// ───────────────────────────────────────────────────────────────
// Time port (driven adapter: domain → monotonic clock)
// ───────────────────────────────────────────────────────────────

/// Monotonic clock plus the blocking settle delays the radios need.
pub trait TimePort {
    /// Milliseconds since boot.
    fn now_ms(&self) -> u64;

    /// Block the calling task.
    fn delay_ms(&mut self, ms: u32);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent tunables)
// ───────────────────────────────────────────────────────────────

/// Loads and persists [`SystemConfig`].
///
/// Implementations MUST validate before persisting and reject invalid
/// values with [`ConfigError::ValidationFailed`] rather than clamping.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`SystemConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&mut self, config: &SystemConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage.
///
/// - Keys are namespaced to prevent collisions between subsystems.
/// - Write operations MUST be atomic, with no partial writes on power loss.
///   The ESP-IDF NVS API guarantees this natively; in-memory simulation
///   achieves it trivially.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for ConfigError {}
impl std::error::Error for StorageError {}
