use log::{info, warn};

use super::LinkState;
use crate::app::ports::{NetworkPort, TimePort};

/// Wi-Fi station join with a bounded attempt window.
#[derive(Debug)]
pub struct NetworkSupervisor {
    state: LinkState,
    started_at_ms: u64,
    timeout_ms: u32,
}

impl NetworkSupervisor {
    pub fn new(timeout_ms: u32) -> Self {
        Self {
            state: LinkState::Idle,
            started_at_ms: 0,
            timeout_ms,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_established(&self) -> bool {
        self.state == LinkState::Established
    }

    /// Begin a join.  Ignored unless idle, so at most one attempt is in
    /// flight.  Returns whether an attempt was started.
    pub fn start<N: NetworkPort>(&mut self, net: &mut N, name: &str, secret: &str, now_ms: u64) -> bool {
        if self.state != LinkState::Idle {
            return false;
        }

        if let Err(e) = net.set_station_mode().and_then(|()| net.begin(name, secret)) {
            warn!("network: join '{}' not started: {e}", name);
            return false;
        }

        info!("network: joining '{}'", name);
        self.state = LinkState::Attempting;
        self.started_at_ms = now_ms;
        true
    }

    /// Advance the state machine.  Never blocks.
    ///
    /// Returns the new state when it changed on this call.
    pub fn poll<N: NetworkPort>(&mut self, net: &N, now_ms: u64) -> Option<LinkState> {
        let next = match self.state {
            LinkState::Idle => return None,
            LinkState::Attempting if net.is_connected() => {
                info!("network: joined");
                LinkState::Established
            }
            LinkState::Attempting => {
                let elapsed = now_ms.saturating_sub(self.started_at_ms);
                if elapsed <= u64::from(self.timeout_ms) {
                    return None;
                }
                warn!("network: join timed out after {} ms", elapsed);
                LinkState::Idle
            }
            LinkState::Established if net.is_connected() => return None,
            LinkState::Established => {
                warn!("network: link lost");
                LinkState::Idle
            }
        };
        self.state = next;
        Some(next)
    }

    /// Drop the link (or abandon the attempt) and return to idle.
    pub fn stop<N: NetworkPort>(&mut self, net: &mut N) {
        if self.state != LinkState::Idle {
            info!("network: stopping ({})", self.state);
        }
        net.disconnect();
        self.state = LinkState::Idle;
    }
}

/// Synchronous join for boot: start the supervisor and poll it until the
/// link comes up or the attempt times out.
///
/// Returns `true` when the link is established.
pub fn join_blocking<N: NetworkPort, T: TimePort>(
    sup: &mut NetworkSupervisor,
    net: &mut N,
    clock: &mut T,
    name: &str,
    secret: &str,
    poll_interval_ms: u32,
) -> bool {
    if !sup.start(net, name, secret, clock.now_ms()) && !sup.is_established() {
        return false;
    }

    loop {
        sup.poll(net, clock.now_ms());
        match sup.state() {
            LinkState::Established => return true,
            LinkState::Idle => return false,
            LinkState::Attempting => clock.delay_ms(poll_interval_ms),
        }
    }
}
