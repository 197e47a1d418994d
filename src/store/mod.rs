//! Durable configuration store.
//!
//! Holds the single in-memory [`ConfigRecord`] and mirrors it to one NVS
//! blob.  A blob that fails its integrity tag is never trusted: `load`
//! falls back to the built-in defaults and reports why.

pub mod record;

use log::{debug, info, warn};

use crate::app::ports::StoragePort;
use crate::error::StoreError;
use record::{ConfigRecord, RECORD_LEN};

/// NVS namespace of the record.
pub const RECORD_NAMESPACE: &str = "config";
/// NVS key of the record.
pub const RECORD_KEY: &str = "cfg";

pub struct ConfigStore<S> {
    storage: S,
    record: ConfigRecord,
}

impl<S: StoragePort> ConfigStore<S> {
    /// Wrap `storage`; the record starts at its defaults until [`load`](Self::load).
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            record: ConfigRecord::default(),
        }
    }

    /// Replace the in-memory record with the persisted one.
    ///
    /// On any failure the record is reset to defaults (sealed) and the cause
    /// is returned.
    pub fn load(&mut self) -> Result<(), StoreError> {
        match self.read_persisted() {
            Ok(record) => {
                debug!("store: loaded record (tag {:#010x})", record.tag());
                self.record = record;
                Ok(())
            }
            Err(e) => {
                warn!("store: load failed ({e}), using defaults");
                self.reset_to_default();
                Err(e)
            }
        }
    }

    fn read_persisted(&self) -> Result<ConfigRecord, StoreError> {
        // One spare byte so an oversized blob shows up as a length error.
        let mut buf = [0u8; RECORD_LEN + 1];
        let n = self.storage.read(RECORD_NAMESPACE, RECORD_KEY, &mut buf)?;
        Ok(ConfigRecord::decode(&buf[..n])?)
    }

    /// Seal and persist the whole record.
    pub fn save(&mut self) -> Result<(), StoreError> {
        self.record.seal();
        self.storage
            .write(RECORD_NAMESPACE, RECORD_KEY, &self.record.encode())?;
        debug!("store: saved record (tag {:#010x})", self.record.tag());
        Ok(())
    }

    /// Erase the persisted record.  The in-memory copy is left untouched.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.storage.delete(RECORD_NAMESPACE, RECORD_KEY)?;
        info!("store: record erased");
        Ok(())
    }

    /// Restore defaults in memory only.
    pub fn reset_to_default(&mut self) {
        self.record = ConfigRecord::default();
    }

    pub fn is_valid(&self) -> bool {
        self.record.is_sealed()
    }

    pub fn record(&self) -> &ConfigRecord {
        &self.record
    }

    /// Mutable access for bulk updates; follow with [`save`](Self::save).
    pub fn record_mut(&mut self) -> &mut ConfigRecord {
        &mut self.record
    }

    /// Update the operating status, persisting only when it changes.
    ///
    /// Returns whether the stored value changed.
    pub fn set_status(&mut self, status: &str) -> Result<bool, StoreError> {
        let before = self.record.status();
        let mut next = self.record.clone();
        next.set_status(status);
        if next.status() == before {
            return Ok(false);
        }
        self.record = next;
        self.save()?;
        Ok(true)
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }
}
