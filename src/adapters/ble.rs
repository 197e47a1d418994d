//! BLE provisioning adapter.
//!
//! Implements [`ProvisioningPort`], the hexagonal boundary for pushing
//! credentials to the node from a phone.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: NimBLE GATT server via `esp32-nimble`.
//! - **all other targets**: simulation stubs for host-side tests.
//!
//! ## GATT Service Layout
//!
//! | Attribute            | UUID                                     | Perms       |
//! |----------------------|------------------------------------------|-------------|
//! | Service              | `0x180A`                                 | -           |
//! | Device name          | `0x2A00`                                 | Read        |
//! | Network name         | `8cbda693-…-1fd9ef3ac3d4`                | Read+Write  |
//! | Network secret       | `bce09c25-…-bcf162a445b2`                | Read+Write  |
//! | Broker address       | `dfb28fc6-…-c7d68a86d544`                | Read+Write  |
//!
//! Write callbacks run on the NimBLE host task; they only copy the value
//! into a [`WriteQueue`] which the main loop drains.

use log::info;

use crate::app::ports::{AttributeSeed, ProvisioningPort};
use crate::error::CommsError;
use crate::provisioning::{CredentialField, FieldWrite, WriteQueue};

// ───────────────────────────────────────────────────────────────
// Constants
// ───────────────────────────────────────────────────────────────

pub const SERVICE_UUID16: u16 = 0x180A;
pub const DEVICE_NAME_UUID16: u16 = 0x2A00;
pub const CHAR_NETWORK_NAME: &str = "8cbda693-fde4-49df-a2e9-1fd9ef3ac3d4";
pub const CHAR_NETWORK_SECRET: &str = "bce09c25-d280-42f0-8b67-bcf162a445b2";
pub const CHAR_BROKER_ADDRESS: &str = "dfb28fc6-a1ce-4b71-9480-c7d68a86d544";

/// Settle after advertising stops.
pub const ADVERTISING_STOP_SETTLE_MS: u32 = 300;
/// Gap between two peer disconnects.
pub const PEER_DISCONNECT_GAP_MS: u32 = 200;
/// Settle after the last peer is gone.
pub const PEERS_SETTLE_MS: u32 = 500;
/// Settle after the callbacks are detached, before deinit.
pub const CALLBACK_SETTLE_MS: u32 = 200;

/// Which credential a characteristic UUID carries.
pub fn field_for_uuid(uuid: &str) -> Option<CredentialField> {
    [
        (CHAR_NETWORK_NAME, CredentialField::NetworkName),
        (CHAR_NETWORK_SECRET, CredentialField::NetworkSecret),
        (CHAR_BROKER_ADDRESS, CredentialField::BrokerAddress),
    ]
    .into_iter()
    .find(|(u, _)| u.eq_ignore_ascii_case(uuid))
    .map(|(_, f)| f)
}

// ───────────────────────────────────────────────────────────────
// BLE state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BleState {
    Idle,
    Advertising,
    Connected,
}

// ── ESP-IDF static state (shared with NimBLE callbacks) ────────

#[cfg(target_os = "espidf")]
use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

#[cfg(target_os = "espidf")]
static FIELD_WRITES: WriteQueue = WriteQueue::new();
/// Cleared before teardown so late writes are discarded.
#[cfg(target_os = "espidf")]
static ACCEPTING: AtomicBool = AtomicBool::new(false);
#[cfg(target_os = "espidf")]
static PEERS: AtomicU8 = AtomicU8::new(0);

#[cfg(target_os = "espidf")]
const MAX_PEERS: usize = 3;

// ───────────────────────────────────────────────────────────────
// BLE adapter
// ───────────────────────────────────────────────────────────────

pub struct BleAdapter {
    active: bool,
    #[cfg(not(target_os = "espidf"))]
    queue: WriteQueue,
    #[cfg(not(target_os = "espidf"))]
    peers: u8,
    #[cfg(not(target_os = "espidf"))]
    attributes: [heapless::String<64>; 4],
}

impl Default for BleAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl BleAdapter {
    pub fn new() -> Self {
        Self {
            active: false,
            #[cfg(not(target_os = "espidf"))]
            queue: WriteQueue::new(),
            #[cfg(not(target_os = "espidf"))]
            peers: 0,
            #[cfg(not(target_os = "espidf"))]
            attributes: Default::default(),
        }
    }

    pub fn state(&self) -> BleState {
        match (self.active, self.peer_count()) {
            (false, _) => BleState::Idle,
            (true, 0) => BleState::Advertising,
            (true, _) => BleState::Connected,
        }
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn peer_count(&self) -> u8 {
        PEERS.load(Ordering::Acquire)
    }

    #[cfg(not(target_os = "espidf"))]
    fn peer_count(&self) -> u8 {
        self.peers
    }

    #[cfg(target_os = "espidf")]
    fn platform_start(&mut self, seed: &AttributeSeed<'_>) -> Result<(), CommsError> {
        use esp32_nimble::utilities::BleUuid;
        use esp32_nimble::{BLEAdvertisementData, BLEDevice, NimbleProperties, uuid128};

        let device = BLEDevice::take();
        BLEDevice::set_device_name(seed.device_name).map_err(|e| {
            log::warn!("BLE: set device name failed: {:?}", e);
            CommsError::BleInitFailed
        })?;

        let server = device.get_server();
        server.advertise_on_disconnect(true);
        server.on_connect(|_server, desc| {
            PEERS.fetch_add(1, Ordering::AcqRel);
            info!("BLE: central connected ({:?})", desc.address());
        });
        server.on_disconnect(|_desc, reason| {
            let _ = PEERS.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
            info!("BLE: central disconnected ({:?}), advertising again", reason);
        });

        let service_uuid = BleUuid::from_uuid16(SERVICE_UUID16);
        let service = server.create_service(service_uuid);

        let name = service.lock().create_characteristic(
            BleUuid::from_uuid16(DEVICE_NAME_UUID16),
            NimbleProperties::READ,
        );
        name.lock().set_value(seed.device_name.as_bytes());

        let credentials = [
            (
                uuid128!("8cbda693-fde4-49df-a2e9-1fd9ef3ac3d4"),
                CredentialField::NetworkName,
                seed.network_name,
            ),
            (
                uuid128!("bce09c25-d280-42f0-8b67-bcf162a445b2"),
                CredentialField::NetworkSecret,
                seed.network_secret,
            ),
            (
                uuid128!("dfb28fc6-a1ce-4b71-9480-c7d68a86d544"),
                CredentialField::BrokerAddress,
                seed.broker_host,
            ),
        ];
        for (uuid, field, value) in credentials {
            let ch = service
                .lock()
                .create_characteristic(uuid, NimbleProperties::READ | NimbleProperties::WRITE);
            ch.lock().set_value(value.as_bytes());
            ch.lock().on_write(move |args| {
                if !ACCEPTING.load(Ordering::Acquire) {
                    return;
                }
                if FIELD_WRITES.try_send(FieldWrite::new(field, args.recv_data())).is_err() {
                    log::warn!("BLE: write queue full, {:?} dropped", field);
                }
            });
        }

        ACCEPTING.store(true, Ordering::Release);

        let advertising = device.get_advertising();
        advertising
            .lock()
            .set_data(
                BLEAdvertisementData::new()
                    .name(seed.device_name)
                    .add_service_uuid(service_uuid),
            )
            .map_err(|e| {
                log::warn!("BLE: advertisement data rejected: {:?}", e);
                CommsError::BleInitFailed
            })?;
        advertising.lock().start().map_err(|e| {
            log::warn!("BLE: advertising start failed: {:?}", e);
            CommsError::BleInitFailed
        })?;
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_start(&mut self, seed: &AttributeSeed<'_>) -> Result<(), CommsError> {
        use crate::text::bounded;

        self.attributes = [
            bounded(seed.device_name),
            bounded(seed.network_name),
            bounded(seed.network_secret),
            bounded(seed.broker_host),
        ];
        self.peers = 0;
        info!("BLE(sim): advertising as '{}'", seed.device_name);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_stop(&mut self) {
        use esp_idf_hal::delay::FreeRtos;
        use esp32_nimble::BLEDevice;

        ACCEPTING.store(false, Ordering::Release);
        let device = BLEDevice::take();

        if let Err(e) = device.get_advertising().lock().stop() {
            log::warn!("BLE: advertising stop: {:?}", e);
        }
        FreeRtos::delay_ms(ADVERTISING_STOP_SETTLE_MS);

        let server = device.get_server();
        server.advertise_on_disconnect(false);
        let peers: heapless::Vec<u16, MAX_PEERS> = server
            .connections()
            .map(|desc| desc.conn_handle())
            .take(MAX_PEERS)
            .collect();
        for handle in peers {
            if let Err(e) = server.disconnect(handle) {
                log::warn!("BLE: disconnect peer {}: {:?}", handle, e);
            }
            FreeRtos::delay_ms(PEER_DISCONNECT_GAP_MS);
        }
        FreeRtos::delay_ms(PEERS_SETTLE_MS);

        server.on_connect(|_, _| {});
        server.on_disconnect(|_, _| {});
        FreeRtos::delay_ms(CALLBACK_SETTLE_MS);

        if let Err(e) = BLEDevice::deinit() {
            log::warn!("BLE: deinit: {e}");
        }
        PEERS.store(0, Ordering::Release);
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_stop(&mut self) {
        self.peers = 0;
        info!("BLE(sim): released");
    }

    // ── Simulation hooks ──────────────────────────────────────

    /// A peer writes `raw` to the characteristic `uuid`.  Returns `false`
    /// when the server is down, the UUID is not writable or the queue is
    /// full.
    #[cfg(not(target_os = "espidf"))]
    pub fn simulate_write(&mut self, uuid: &str, raw: &[u8]) -> bool {
        let Some(field) = field_for_uuid(uuid) else {
            return false;
        };
        if !self.active {
            return false;
        }
        self.queue.try_send(FieldWrite::new(field, raw)).is_ok()
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn simulate_connect(&mut self) {
        if self.active {
            self.peers = self.peers.saturating_add(1);
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn simulate_disconnect(&mut self) {
        self.peers = self.peers.saturating_sub(1);
    }

    /// Seeded read-back value of the attribute carrying `field`.
    #[cfg(not(target_os = "espidf"))]
    pub fn attribute(&self, field: CredentialField) -> &str {
        let idx = match field {
            CredentialField::NetworkName => 1,
            CredentialField::NetworkSecret => 2,
            CredentialField::BrokerAddress => 3,
        };
        &self.attributes[idx]
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn device_name(&self) -> &str {
        &self.attributes[0]
    }
}

// ───────────────────────────────────────────────────────────────
// ProvisioningPort
// ───────────────────────────────────────────────────────────────

impl ProvisioningPort for BleAdapter {
    fn start(&mut self, seed: &AttributeSeed<'_>) -> Result<(), CommsError> {
        if self.active {
            return Ok(());
        }
        if let Err(e) = self.platform_start(seed) {
            // Release whatever came up before the failure.
            self.platform_stop();
            return Err(e);
        }
        self.active = true;
        info!("BLE: provisioning server up ('{}')", seed.device_name);
        Ok(())
    }

    fn stop(&mut self) {
        if !self.active {
            return;
        }
        self.platform_stop();
        self.active = false;
        info!("BLE: provisioning server down");
    }

    fn is_active(&self) -> bool {
        self.active
    }

    #[cfg(target_os = "espidf")]
    fn take_write(&mut self) -> Option<FieldWrite> {
        FIELD_WRITES.try_receive().ok()
    }

    #[cfg(not(target_os = "espidf"))]
    fn take_write(&mut self) -> Option<FieldWrite> {
        self.queue.try_receive().ok()
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
