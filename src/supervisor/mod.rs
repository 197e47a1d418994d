//! Connection supervisors: one non-blocking state machine per network
//! resource.
//!
//! ```text
//!          start()              port connected
//!   IDLE ──────────▶ ATTEMPTING ───────────────▶ ESTABLISHED
//!    ▲                   │                           │
//!    └──[timeout/stop]───┘◀───────[link lost]────────┘ (broker)
//!    ▲                                               │
//!    └─────────────────────[stop / lost]─────────────┘ (network)
//! ```
//!
//! Supervisors hold no port; the caller passes the port on every call, so
//! the same supervisor drives the ESP-IDF adapter, the simulation and the
//! test mocks.

mod broker;
mod network;

pub use broker::BrokerSupervisor;
pub use network::{NetworkSupervisor, join_blocking};

use core::fmt;

/// Where one resource's connection attempt stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    #[default]
    Idle,
    Attempting,
    Established,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Attempting => write!(f, "attempting"),
            Self::Established => write!(f, "established"),
        }
    }
}
