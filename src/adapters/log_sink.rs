//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(state) => info!("START | initial_state={}", state),
            AppEvent::ConfigFallback => warn!("CONFIG | stored record rejected, defaults in use"),
            AppEvent::StateChanged { from, to } => info!("STATE | {} -> {}", from, to),
            AppEvent::CredentialsCommitted => info!("PROV  | credentials committed"),
            AppEvent::NetworkJoined => info!("NET   | joined"),
            AppEvent::NetworkJoinTimedOut => warn!("NET   | join timed out"),
            AppEvent::NetworkLost => warn!("NET   | link lost"),
            AppEvent::BrokerConnected => info!("MQTT  | connected"),
            AppEvent::StatusChanged(status) => info!("STATUS| '{}'", status),
            AppEvent::FactoryReset => warn!("RESET | record erased, restarting"),
        }
    }
}
