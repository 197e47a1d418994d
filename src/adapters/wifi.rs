//! Wi-Fi station-mode adapter.
//!
//! Implements [`NetworkPort`], the hexagonal boundary for joining the
//! configured access point.  Every call returns immediately; the
//! [`NetworkSupervisor`](crate::supervisor::NetworkSupervisor) owns the
//! timeout and polls [`is_connected`](NetworkPort::is_connected).
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::wifi::EspWifi` in STA mode.
//! - **all other targets**: an in-memory access point for host-side runs.
//!
//! ## Radio tuning
//!
//! After each join request the modem is pinned to full power: power save
//! off and maximum TX power, matching the deployed nodes' link budget.

use log::{info, warn};

use crate::app::ports::NetworkPort;
use crate::error::CommsError;

/// `esp_wifi_set_max_tx_power` units are 0.25 dBm; 34 → 8.5 dBm.
pub const MAX_TX_POWER_QDBM: i8 = 34;
/// Settle before the disconnect request.
pub const PRE_DISCONNECT_SETTLE_MS: u32 = 50;
/// Settle after the radio is switched off.
pub const POST_DISCONNECT_SETTLE_MS: u32 = 100;

// ───────────────────────────────────────────────────────────────
// Wi-Fi adapter (ESP-IDF)
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub struct WifiAdapter {
    wifi: esp_idf_svc::wifi::EspWifi<'static>,
    started: bool,
}

#[cfg(target_os = "espidf")]
impl WifiAdapter {
    pub fn new(
        modem: esp_idf_hal::modem::Modem,
        sysloop: esp_idf_svc::eventloop::EspSystemEventLoop,
    ) -> Result<Self, CommsError> {
        let wifi = esp_idf_svc::wifi::EspWifi::new(modem, sysloop, None).map_err(|e| {
            warn!("WiFi: driver init failed: {e}");
            CommsError::WifiConfigFailed
        })?;
        Ok(Self { wifi, started: false })
    }

    fn tune_radio() {
        use esp_idf_svc::sys::{esp_wifi_set_max_tx_power, esp_wifi_set_ps, wifi_ps_type_t_WIFI_PS_NONE};

        // SAFETY: both calls only require the Wi-Fi driver to be started,
        // which `begin` guarantees before calling this.
        unsafe {
            if esp_wifi_set_ps(wifi_ps_type_t_WIFI_PS_NONE) != 0 {
                warn!("WiFi: could not disable power save");
            }
            if esp_wifi_set_max_tx_power(MAX_TX_POWER_QDBM) != 0 {
                warn!("WiFi: could not raise TX power");
            }
        }
    }
}

#[cfg(target_os = "espidf")]
impl NetworkPort for WifiAdapter {
    fn set_station_mode(&mut self) -> Result<(), CommsError> {
        use esp_idf_svc::wifi::{ClientConfiguration, Configuration};

        self.wifi
            .set_configuration(&Configuration::Client(ClientConfiguration::default()))
            .map_err(|e| {
                warn!("WiFi: STA configuration rejected: {e}");
                CommsError::WifiConfigFailed
            })
    }

    fn begin(&mut self, name: &str, secret: &str) -> Result<(), CommsError> {
        use esp_idf_svc::wifi::{AuthMethod, ClientConfiguration, Configuration};

        let auth_method = if secret.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let client = ClientConfiguration {
            ssid: name.try_into().map_err(|()| CommsError::WifiConfigFailed)?,
            password: secret.try_into().map_err(|()| CommsError::WifiConfigFailed)?,
            auth_method,
            ..Default::default()
        };
        self.wifi
            .set_configuration(&Configuration::Client(client))
            .map_err(|e| {
                warn!("WiFi: credentials rejected by driver: {e}");
                CommsError::WifiConfigFailed
            })?;

        if !self.started {
            self.wifi.start().map_err(|e| {
                warn!("WiFi: start failed: {e}");
                CommsError::WifiConnectFailed
            })?;
            self.started = true;
        }

        self.wifi.connect().map_err(|e| {
            warn!("WiFi: connect request failed: {e}");
            CommsError::WifiConnectFailed
        })?;
        Self::tune_radio();
        info!("WiFi: joining '{}'", name);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.wifi.is_up().unwrap_or(false)
    }

    fn disconnect(&mut self) {
        use esp_idf_hal::delay::FreeRtos;

        FreeRtos::delay_ms(PRE_DISCONNECT_SETTLE_MS);
        if let Err(e) = self.wifi.disconnect() {
            warn!("WiFi: disconnect: {e}");
        }
        if self.started {
            if let Err(e) = self.wifi.stop() {
                warn!("WiFi: stop: {e}");
            }
            self.started = false;
        }
        FreeRtos::delay_ms(POST_DISCONNECT_SETTLE_MS);
        info!("WiFi: radio off");
    }
}

// ───────────────────────────────────────────────────────────────
// Wi-Fi adapter (simulation)
// ───────────────────────────────────────────────────────────────

/// Host-side access point.  Joins complete immediately while the access
/// point is reachable.
#[cfg(not(target_os = "espidf"))]
pub struct WifiAdapter {
    station: bool,
    reachable: bool,
    link_up: bool,
    joined: Option<heapless::String<32>>,
}

#[cfg(not(target_os = "espidf"))]
impl Default for WifiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(target_os = "espidf"))]
impl WifiAdapter {
    pub fn new() -> Self {
        Self {
            station: false,
            reachable: true,
            link_up: false,
            joined: None,
        }
    }

    /// Make later joins fail (or succeed again).
    pub fn set_reachable(&mut self, reachable: bool) {
        self.reachable = reachable;
    }

    /// Simulate the access point going away.
    pub fn drop_link(&mut self) {
        if self.link_up {
            warn!("WiFi(sim): link dropped");
        }
        self.link_up = false;
    }

    /// Name of the network last joined.
    pub fn joined(&self) -> Option<&str> {
        self.joined.as_deref()
    }
}

#[cfg(not(target_os = "espidf"))]
impl NetworkPort for WifiAdapter {
    fn set_station_mode(&mut self) -> Result<(), CommsError> {
        self.station = true;
        Ok(())
    }

    fn begin(&mut self, name: &str, _secret: &str) -> Result<(), CommsError> {
        if !self.station {
            return Err(CommsError::WifiConfigFailed);
        }
        self.link_up = self.reachable;
        if self.link_up {
            self.joined = Some(crate::text::bounded(name));
            info!("WiFi(sim): joined '{}'", name);
        } else {
            info!("WiFi(sim): '{}' out of range", name);
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.link_up
    }

    fn disconnect(&mut self) {
        self.link_up = false;
        self.station = false;
        info!("WiFi(sim): radio off");
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
