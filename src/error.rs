//! Error types shared across the node firmware.
//!
//! Store failures are reported to the caller so boot can fall back to
//! defaults; transport failures are absorbed by the supervisors and retried.
//! Both are `Copy` so they pass through the tick loop without allocation.

use core::fmt;

use crate::app::ports::StorageError;
use crate::store::record::RecordError;

// ---------------------------------------------------------------------------
// Configuration store errors
// ---------------------------------------------------------------------------

/// Why the configuration record could not be loaded, saved or cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// No record has ever been persisted (or it was erased).
    NotFound,
    /// A blob exists but failed the length, tag or field checks.
    Corrupted(RecordError),
    /// The storage backend refused the operation.
    Storage(StorageError),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "no stored record"),
            Self::Corrupted(e) => write!(f, "stored record corrupted: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<RecordError> for StoreError {
    fn from(e: RecordError) -> Self {
        Self::Corrupted(e)
    }
}

impl From<StorageError> for StoreError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound => Self::NotFound,
            other => Self::Storage(other),
        }
    }
}

// ---------------------------------------------------------------------------
// Communications errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    WifiConfigFailed,
    WifiConnectFailed,
    MqttConnectFailed,
    MqttSubscribeFailed,
    MqttPublishFailed,
    BleInitFailed,
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WifiConfigFailed => write!(f, "WiFi configuration rejected"),
            Self::WifiConnectFailed => write!(f, "WiFi connect failed"),
            Self::MqttConnectFailed => write!(f, "MQTT connect failed"),
            Self::MqttSubscribeFailed => write!(f, "MQTT subscribe failed"),
            Self::MqttPublishFailed => write!(f, "MQTT publish failed"),
            Self::BleInitFailed => write!(f, "BLE init failed"),
        }
    }
}

impl std::error::Error for CommsError {}
