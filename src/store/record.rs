//! Fixed-layout configuration record and its integrity tag.
//!
//! ```text
//!   0      32      64              128   132      152   156
//!   ├ name ┼ secret┼ broker host   ┼port ┼ status ┼ tag ┤
//! ```
//!
//! Text slots are NUL-padded; the port is a little-endian `i32`; the tag is
//! the wrapping byte sum of everything before it.  The layout is shared with
//! records already written by deployed units, so it must not change.
//!
//! The additive tag catches any single corrupted byte and most accidental
//! multi-byte damage.  It is NOT a MAC: anyone able to write flash can forge
//! a matching tag.

use core::fmt;

use heapless::String;

use crate::text::{bounded, until_nul};

pub const NAME_LEN: usize = 31;
pub const SECRET_LEN: usize = 31;
pub const HOST_LEN: usize = 63;
pub const STATUS_LEN: usize = 19;

const NAME_OFFSET: usize = 0;
const SECRET_OFFSET: usize = 32;
const HOST_OFFSET: usize = 64;
const PORT_OFFSET: usize = 128;
const STATUS_OFFSET: usize = 132;
const TAG_OFFSET: usize = 152;

/// Encoded size of a record, tag included.
pub const RECORD_LEN: usize = 156;

pub const STATUS_ONLINE: &str = "online";
pub const STATUS_OFFLINE: &str = "offline";

pub type NetworkName = String<NAME_LEN>;
pub type NetworkSecret = String<SECRET_LEN>;
pub type BrokerHost = String<HOST_LEN>;
pub type StatusText = String<STATUS_LEN>;

/// Wrapping `u32` sum of `bytes`.
pub fn checksum(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .fold(0u32, |acc, &b| acc.wrapping_add(u32::from(b)))
}

/// Why a stored blob was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordError {
    /// Blob is not exactly [`RECORD_LEN`] bytes.
    Length(usize),
    /// Stored tag does not match the recomputed one.
    Checksum { stored: u32, computed: u32 },
    /// A text slot has no NUL terminator.
    Unterminated(&'static str),
    /// A text slot is not UTF-8.
    Encoding(&'static str),
    /// Port outside `0..=65535`.
    Port(i32),
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Length(n) => write!(f, "length {n}, expected {RECORD_LEN}"),
            Self::Checksum { stored, computed } => {
                write!(f, "tag {stored:#010x} != computed {computed:#010x}")
            }
            Self::Unterminated(field) => write!(f, "{field} not terminated"),
            Self::Encoding(field) => write!(f, "{field} not UTF-8"),
            Self::Port(p) => write!(f, "port {p} out of range"),
        }
    }
}

/// Credentials plus operating status, as persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigRecord {
    network_name: NetworkName,
    network_secret: NetworkSecret,
    broker_host: BrokerHost,
    broker_port: u16,
    status: StatusText,
    tag: u32,
}

impl Default for ConfigRecord {
    fn default() -> Self {
        let mut record = Self {
            network_name: bounded("ABC"),
            network_secret: bounded("12345678"),
            broker_host: bounded("192.168.1.100"),
            broker_port: 1883,
            status: bounded(STATUS_ONLINE),
            tag: 0,
        };
        record.seal();
        record
    }
}

impl ConfigRecord {
    pub fn network_name(&self) -> &str {
        &self.network_name
    }

    pub fn network_secret(&self) -> &str {
        &self.network_secret
    }

    pub fn broker_host(&self) -> &str {
        &self.broker_host
    }

    pub fn broker_port(&self) -> u16 {
        self.broker_port
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn tag(&self) -> u32 {
        self.tag
    }

    /// Setters cut at the first NUL, truncate to the slot bound and leave
    /// the tag stale until [`seal`](Self::seal).
    pub fn set_network_name(&mut self, name: &str) {
        self.network_name = bounded(until_nul(name));
    }

    pub fn set_network_secret(&mut self, secret: &str) {
        self.network_secret = bounded(until_nul(secret));
    }

    pub fn set_broker_host(&mut self, host: &str) {
        self.broker_host = bounded(until_nul(host));
    }

    pub fn set_broker_port(&mut self, port: u16) {
        self.broker_port = port;
    }

    pub fn set_status(&mut self, status: &str) {
        self.status = bounded(until_nul(status));
    }

    /// Tag over the canonical encoding of the current fields.
    pub fn compute_tag(&self) -> u32 {
        checksum(&self.encode()[..TAG_OFFSET])
    }

    pub fn seal(&mut self) {
        self.tag = self.compute_tag();
    }

    pub fn is_sealed(&self) -> bool {
        self.tag == self.compute_tag()
    }

    /// Canonical byte image, zero-padded, carrying the current tag.
    pub fn encode(&self) -> [u8; RECORD_LEN] {
        let mut buf = [0u8; RECORD_LEN];
        put_text(&mut buf[NAME_OFFSET..SECRET_OFFSET], &self.network_name);
        put_text(&mut buf[SECRET_OFFSET..HOST_OFFSET], &self.network_secret);
        put_text(&mut buf[HOST_OFFSET..PORT_OFFSET], &self.broker_host);
        buf[PORT_OFFSET..STATUS_OFFSET].copy_from_slice(&i32::from(self.broker_port).to_le_bytes());
        put_text(&mut buf[STATUS_OFFSET..TAG_OFFSET], &self.status);
        buf[TAG_OFFSET..].copy_from_slice(&self.tag.to_le_bytes());
        buf
    }

    /// Validate and decode a stored blob.
    ///
    /// The tag is checked over the raw bytes, so padding written by older
    /// firmware still counts.  The returned record is re-sealed over its
    /// canonical encoding.
    pub fn decode(raw: &[u8]) -> Result<Self, RecordError> {
        if raw.len() != RECORD_LEN {
            return Err(RecordError::Length(raw.len()));
        }

        let stored = u32::from_le_bytes(word(&raw[TAG_OFFSET..]));
        let computed = checksum(&raw[..TAG_OFFSET]);
        if stored != computed {
            return Err(RecordError::Checksum { stored, computed });
        }

        let port = i32::from_le_bytes(word(&raw[PORT_OFFSET..STATUS_OFFSET]));
        let mut record = Self {
            network_name: bounded(get_text(&raw[NAME_OFFSET..SECRET_OFFSET], "network name")?),
            network_secret: bounded(get_text(&raw[SECRET_OFFSET..HOST_OFFSET], "network secret")?),
            broker_host: bounded(get_text(&raw[HOST_OFFSET..PORT_OFFSET], "broker host")?),
            broker_port: u16::try_from(port).map_err(|_| RecordError::Port(port))?,
            status: bounded(get_text(&raw[STATUS_OFFSET..TAG_OFFSET], "status")?),
            tag: 0,
        };
        record.seal();
        Ok(record)
    }
}

fn word(bytes: &[u8]) -> [u8; 4] {
    let mut w = [0u8; 4];
    w.copy_from_slice(&bytes[..4]);
    w
}

/// Slots are one byte longer than the text bound, so the terminator always fits.
fn put_text(slot: &mut [u8], text: &str) {
    let n = text.len().min(slot.len() - 1);
    slot[..n].copy_from_slice(&text.as_bytes()[..n]);
}

fn get_text<'a>(slot: &'a [u8], field: &'static str) -> Result<&'a str, RecordError> {
    let end = slot
        .iter()
        .position(|&b| b == 0)
        .ok_or(RecordError::Unterminated(field))?;
    core::str::from_utf8(&slot[..end]).map_err(|_| RecordError::Encoding(field))
}
