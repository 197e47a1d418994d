//! System configuration parameters
//!
//! Timing, identity and topic tunables for the node.  Credentials are NOT
//! here: they live in the checksummed record owned by [`crate::store`].
//! Values can be overridden via NVS (see [`crate::adapters::nvs`]).

use heapless::String;
use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::text::bounded;

pub type Label = String<32>;
pub type Topic = String<64>;

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Identity ---
    /// Advertised BLE name and value of the device-name attribute
    pub device_name: Label,
    /// MQTT client identifier
    pub broker_client_id: Label,
    pub broker_user: Label,
    pub broker_password: Label,

    // --- Topics ---
    /// Inbound commands and free-form status updates
    pub command_topic: Topic,
    /// Outbound presence announcements ("online" / "offline")
    pub status_topic: Topic,
    /// Inbound factory-reset requests only
    pub reset_topic: Topic,

    // --- Connection timing ---
    /// Abandon a Wi-Fi join attempt after this long
    pub join_timeout_ms: u32,
    /// Poll period of the blocking boot-time join
    pub join_poll_interval_ms: u32,
    /// Minimum gap between broker connect attempts (0 = every loop pass)
    pub broker_retry_interval_ms: u32,
    /// Join Wi-Fi before entering the main loop
    pub boot_join: bool,

    // --- Loop timing ---
    /// Button re-sample delay after a falling edge
    pub button_settle_ms: u32,
    /// Pause after tearing down one radio before starting the other
    pub radio_settle_ms: u32,
    /// Main loop period
    pub loop_interval_ms: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Identity
            device_name: bounded("ESP32"),
            broker_client_id: bounded("ESP32Client"),
            broker_user: bounded("client"),
            broker_password: bounded("123456"),

            // Topics
            command_topic: bounded("ESP32/cmd"),
            status_topic: bounded("ESP32/status"),
            reset_topic: bounded("ESP32/reset"),

            // Connection timing
            join_timeout_ms: 15_000,
            join_poll_interval_ms: 1_000,
            broker_retry_interval_ms: 0,
            boot_join: true,

            // Loop timing
            button_settle_ms: 30,
            radio_settle_ms: 1_000,
            loop_interval_ms: 100,
        }
    }
}

impl SystemConfig {
    /// Range-check every field.  Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device_name.is_empty() {
            return Err(ConfigError::ValidationFailed("device_name must not be empty"));
        }
        if self.broker_client_id.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "broker_client_id must not be empty",
            ));
        }
        if self.command_topic.is_empty() || self.status_topic.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "command_topic and status_topic must not be empty",
            ));
        }
        if !self.reset_topic.is_empty() && self.reset_topic == self.command_topic {
            return Err(ConfigError::ValidationFailed(
                "reset_topic must differ from command_topic",
            ));
        }
        if !(1_000..=120_000).contains(&self.join_timeout_ms) {
            return Err(ConfigError::ValidationFailed(
                "join_timeout_ms must be 1000–120000",
            ));
        }
        if !(10..=self.join_timeout_ms).contains(&self.join_poll_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "join_poll_interval_ms must be 10–join_timeout_ms",
            ));
        }
        if self.broker_retry_interval_ms > 300_000 {
            return Err(ConfigError::ValidationFailed(
                "broker_retry_interval_ms must be 0–300000",
            ));
        }
        if self.button_settle_ms > 500 {
            return Err(ConfigError::ValidationFailed(
                "button_settle_ms must be 0–500",
            ));
        }
        if self.radio_settle_ms > 10_000 {
            return Err(ConfigError::ValidationFailed(
                "radio_settle_ms must be 0–10000",
            ));
        }
        if !(10..=1_000).contains(&self.loop_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "loop_interval_ms must be 10–1000",
            ));
        }
        Ok(())
    }
}
