//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them.

use crate::fsm::StateId;
use crate::store::record::StatusText;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The application service has started (carries initial state).
    Started(StateId),

    /// The stored record was missing or corrupt; defaults are in use.
    ConfigFallback,

    /// The FSM transitioned between modes.
    StateChanged { from: StateId, to: StateId },

    /// A full credential set was committed from the provisioning link.
    CredentialsCommitted,

    NetworkJoined,

    /// A join attempt ran out its window.
    NetworkJoinTimedOut,

    NetworkLost,

    /// Broker session (re)established and subscribed.
    BrokerConnected,

    /// Operating status changed and was persisted.
    StatusChanged(StatusText),

    /// A reset command erased the store; the device is about to restart.
    FactoryReset,
}
