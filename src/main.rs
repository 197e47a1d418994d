//! FieldNode firmware entry point.
//!
//! Hexagonal architecture with a single cooperative loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  WifiAdapter    MqttAdapter    BleAdapter      Esp32Time       │
//! │  (Network)      (Broker)       (Provisioning)  (TimePort)      │
//! │  NvsAdapter     LogEventSink   ButtonDriver                    │
//! │  (Config+NVS)   (EventSink)    (GPIO0)                         │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  Mode FSM · ConfigStore · Aggregator · Supervisors     │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::{PinDriver, Pull};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use log::{info, warn};

use fieldnode::adapters::ble::BleAdapter;
use fieldnode::adapters::log_sink::LogEventSink;
use fieldnode::adapters::mqtt::MqttAdapter;
use fieldnode::adapters::nvs::NvsAdapter;
use fieldnode::adapters::time::Esp32TimeAdapter;
use fieldnode::adapters::wifi::WifiAdapter;
use fieldnode::app::ports::{ConfigError, ConfigPort};
use fieldnode::app::service::{AppService, Links, TickOutcome};
use fieldnode::config::SystemConfig;
use fieldnode::drivers::button::ButtonDriver;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("FieldNode v{}", env!("CARGO_PKG_VERSION"));

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;

    // ── 2. Settings from NVS (or defaults) ────────────────────
    let mut nvs = NvsAdapter::new()?;
    let config = match nvs.load() {
        Ok(cfg) => cfg,
        Err(ConfigError::ValidationFailed(field)) => {
            warn!("Settings: '{}' out of range, using defaults", field);
            SystemConfig::default()
        }
        Err(e) => {
            warn!("Settings unreadable ({}), rewriting defaults", e);
            let cfg = SystemConfig::default();
            if let Err(e) = nvs.save(&cfg) {
                warn!("Settings: could not persist defaults: {}", e);
            }
            cfg
        }
    };

    // ── 3. Adapters ───────────────────────────────────────────
    let mut links = Links {
        network: WifiAdapter::new(peripherals.modem, sysloop)?,
        broker: MqttAdapter::new(),
        provisioning: BleAdapter::new(),
        clock: Esp32TimeAdapter::new(),
    };
    let mut sink = LogEventSink::new();

    let mut pin = PinDriver::input(peripherals.pins.gpio0)?;
    pin.set_pull(Pull::Up)?;
    let mut button = ButtonDriver::new(pin, config.button_settle_ms);

    // ── 4. Application core ───────────────────────────────────
    let loop_interval_ms = config.loop_interval_ms;
    let mut app = AppService::new(config, nvs);
    app.start(&mut links, &mut sink);

    info!("System ready. Entering main loop.");

    // ── 5. Main loop ──────────────────────────────────────────
    loop {
        let pressed = button.poll(&mut links.clock);

        if app.tick(pressed, &mut links, &mut sink) == TickOutcome::Restart {
            info!("Restarting");
            FreeRtos::delay_ms(100);
            // SAFETY: no flash write is in flight; the store has been erased
            // synchronously above.
            unsafe { esp_idf_svc::sys::esp_restart() };
        }

        FreeRtos::delay_ms(loop_interval_ms);
    }
}
