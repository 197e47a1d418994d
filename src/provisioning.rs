//! Provisioning aggregator: turns three independent credential writes into
//! one atomic commit.
//!
//! A peer writes the network name, network secret and broker address as
//! separate GATT attributes, in any order and possibly more than once.  The
//! BLE stack delivers them on its own task; the adapter only queues a
//! [`FieldWrite`] and the main loop feeds the queue into
//! [`ProvisioningAggregator::accept`].  Staging and the completeness check
//! therefore run in one context and cannot race.
//!
//! ```text
//!   BLE task ──FieldWrite──▶ WriteQueue ──take_write()──▶ accept() ──▶ ConfigStore::save()
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::Vec;
use log::{info, warn};

use crate::app::ports::StoragePort;
use crate::error::StoreError;
use crate::store::ConfigStore;
use crate::store::record::{BrokerHost, NetworkName, NetworkSecret};
use crate::text::{bounded, c_text};

/// Longest raw attribute value kept; covers the widest field plus a NUL.
pub const MAX_WRITE_LEN: usize = 64;
/// Writes buffered between two loop passes.
pub const WRITE_QUEUE_DEPTH: usize = 8;

/// Channel between the BLE callbacks and the main loop.
pub type WriteQueue = Channel<CriticalSectionRawMutex, FieldWrite, WRITE_QUEUE_DEPTH>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialField {
    NetworkName,
    NetworkSecret,
    BrokerAddress,
}

/// One attribute write as received from the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldWrite {
    pub field: CredentialField,
    pub value: Vec<u8, MAX_WRITE_LEN>,
}

impl FieldWrite {
    /// Copy a raw attribute value; bytes past [`MAX_WRITE_LEN`] are dropped.
    pub fn new(field: CredentialField, raw: &[u8]) -> Self {
        let raw = &raw[..raw.len().min(MAX_WRITE_LEN)];
        Self {
            field,
            value: Vec::from_slice(raw).unwrap_or_default(),
        }
    }

    /// Decoded text: cut at NUL, longest valid UTF-8 prefix.
    pub fn text(&self) -> &str {
        c_text(&self.value)
    }
}

/// Staged values; a slot is "received" when it is `Some`.
#[derive(Debug, Default)]
pub struct ProvisioningAggregator {
    network_name: Option<NetworkName>,
    network_secret: Option<NetworkSecret>,
    broker_host: Option<BrokerHost>,
    ready: bool,
}

impl ProvisioningAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage one write and commit if all three fields are now present.
    ///
    /// Returns `Ok(true)` when this write completed the set.  A storage
    /// failure during the commit still applies the values in memory, clears
    /// the staging and raises the ready signal; the error is returned so the
    /// caller can report it.
    pub fn accept<S: StoragePort>(
        &mut self,
        write: &FieldWrite,
        store: &mut ConfigStore<S>,
    ) -> Result<bool, StoreError> {
        let text = write.text();
        match write.field {
            CredentialField::NetworkName => {
                info!("Provisioning: network name '{}'", text);
                self.network_name = Some(bounded(text));
            }
            CredentialField::NetworkSecret => {
                info!("Provisioning: network secret ({} bytes)", text.len());
                self.network_secret = Some(bounded(text));
            }
            CredentialField::BrokerAddress => {
                info!("Provisioning: broker address '{}'", text);
                self.broker_host = Some(bounded(text));
            }
        }

        if !self.is_complete() {
            return Ok(false);
        }

        let (Some(name), Some(secret), Some(host)) = (
            self.network_name.take(),
            self.network_secret.take(),
            self.broker_host.take(),
        ) else {
            return Ok(false);
        };

        let record = store.record_mut();
        record.set_network_name(&name);
        record.set_network_secret(&secret);
        record.set_broker_host(&host);
        self.ready = true;

        info!("Provisioning: credential set complete, saving");
        store.save().map(|()| true).inspect_err(|e| {
            warn!("Provisioning: credentials applied but not persisted: {e}");
        })
    }

    fn is_complete(&self) -> bool {
        self.network_name.is_some() && self.network_secret.is_some() && self.broker_host.is_some()
    }

    /// Number of fields staged so far.
    pub fn received(&self) -> usize {
        usize::from(self.network_name.is_some())
            + usize::from(self.network_secret.is_some())
            + usize::from(self.broker_host.is_some())
    }

    /// One-shot: `true` once after each commit.
    pub fn take_ready(&mut self) -> bool {
        core::mem::take(&mut self.ready)
    }

    /// Forget staged fields and any unconsumed ready signal.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
