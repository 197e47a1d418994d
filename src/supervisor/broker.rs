use log::{debug, info, warn};

use super::LinkState;
use crate::app::ports::BrokerPort;
use crate::config::SystemConfig;
use crate::store::record::STATUS_OFFLINE;

/// Broker session: reconnect on every poll while down, subscribe once up.
#[derive(Debug)]
pub struct BrokerSupervisor {
    state: LinkState,
    last_attempt_ms: Option<u64>,
    retry_interval_ms: u32,
}

impl BrokerSupervisor {
    /// `retry_interval_ms` of 0 retries on every poll.
    pub fn new(retry_interval_ms: u32) -> Self {
        Self {
            state: LinkState::Idle,
            last_attempt_ms: None,
            retry_interval_ms,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_started(&self) -> bool {
        self.state != LinkState::Idle
    }

    /// Point the session at `host:port`; the first connect happens on the
    /// next [`poll`](Self::poll).
    pub fn start<B: BrokerPort>(&mut self, broker: &mut B, host: &str, port: u16) {
        info!("broker: server {}:{}", host, port);
        broker.configure(host, port);
        self.state = LinkState::Attempting;
        self.last_attempt_ms = None;
    }

    /// Keep the session up.  Call only while the network link is
    /// established.  Returns the new state when it changed on this call.
    pub fn poll<B: BrokerPort>(
        &mut self,
        broker: &mut B,
        cfg: &SystemConfig,
        now_ms: u64,
    ) -> Option<LinkState> {
        match self.state {
            LinkState::Idle => None,
            LinkState::Established if broker.is_connected() => None,
            LinkState::Established => {
                warn!("broker: session lost");
                self.state = LinkState::Attempting;
                self.attempt(broker, cfg, now_ms);
                Some(self.state)
            }
            LinkState::Attempting => {
                self.attempt(broker, cfg, now_ms);
                (self.state == LinkState::Established).then_some(self.state)
            }
        }
    }

    fn attempt<B: BrokerPort>(&mut self, broker: &mut B, cfg: &SystemConfig, now_ms: u64) {
        if !broker.is_connected() {
            if let Some(last) = self.last_attempt_ms {
                if now_ms.saturating_sub(last) < u64::from(self.retry_interval_ms) {
                    return;
                }
            }
            self.last_attempt_ms = Some(now_ms);

            debug!("broker: connecting as '{}'", cfg.broker_client_id);
            if let Err(e) = broker.connect(
                &cfg.broker_client_id,
                &cfg.broker_user,
                &cfg.broker_password,
            ) {
                warn!("broker: {e}, retrying");
                return;
            }
            // Transports that finish the handshake asynchronously report
            // connected on a later poll.
            if !broker.is_connected() {
                return;
            }
        }

        for topic in [cfg.command_topic.as_str(), cfg.reset_topic.as_str()] {
            if topic.is_empty() {
                continue;
            }
            if let Err(e) = broker.subscribe(topic) {
                warn!("broker: subscribe '{}' failed: {e}", topic);
                return;
            }
        }
        info!("broker: connected, listening on '{}'", cfg.command_topic);
        self.state = LinkState::Established;
    }

    /// Announce "offline" if still connected, then drop the session.
    pub fn stop<B: BrokerPort>(&mut self, broker: &mut B, status_topic: &str) {
        if broker.is_connected() {
            if let Err(e) = broker.publish(status_topic, STATUS_OFFLINE.as_bytes()) {
                debug!("broker: offline announcement not sent: {e}");
            }
        }
        broker.disconnect();
        if self.state != LinkState::Idle {
            info!("broker: stopped");
        }
        self.state = LinkState::Idle;
        self.last_attempt_ms = None;
    }
}
