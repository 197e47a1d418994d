//! Inbound broker commands.
//!
//! The command channel carries two kinds of payload: the literal
//! `"disconnect"` requests a factory reset, anything else is a free-form
//! status string.  The dedicated reset channel only resets.

use crate::app::ports::BrokerMessage;
use crate::config::SystemConfig;
use crate::store::record::StatusText;
use crate::text::{bounded, until_nul};

/// Payload on the command channel that erases the stored record.
pub const RESET_PAYLOAD: &str = "disconnect";
/// Additional payload accepted on the reset channel.
pub const RESET_ALIAS: &str = "reset";

/// Commands the broker can send into the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerCommand {
    /// Erase the stored record and restart.
    FactoryReset,
    /// Replace the operating status (already truncated).
    SetStatus(StatusText),
}

impl BrokerCommand {
    /// Interpret `msg`; `None` for topics this node does not listen on or
    /// payloads the reset channel does not recognise.
    pub fn parse(msg: &BrokerMessage, cfg: &SystemConfig) -> Option<Self> {
        let payload = String::from_utf8_lossy(&msg.payload);

        if msg.topic == cfg.command_topic {
            if payload == RESET_PAYLOAD {
                return Some(Self::FactoryReset);
            }
            return Some(Self::SetStatus(bounded(until_nul(&payload))));
        }

        if !cfg.reset_topic.is_empty() && msg.topic == cfg.reset_topic {
            return matches!(payload.trim(), RESET_PAYLOAD | RESET_ALIAS).then_some(Self::FactoryReset);
        }

        None
    }
}
