//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to              |
//! |----------------|--------------------|--------------------------|
//! | `ble`          | ProvisioningPort   | NimBLE GATT server       |
//! | `log_sink`     | EventSink          | Serial log output        |
//! | `mqtt`         | BrokerPort         | ESP-IDF MQTT client      |
//! | `nvs`          | ConfigPort         | NVS / in-memory store    |
//! |                | StoragePort        |                          |
//! | `time`         | TimePort           | ESP32 system timer       |
//! | `wifi`         | NetworkPort        | ESP-IDF WiFi STA         |

pub mod ble;
pub mod log_sink;
pub mod mqtt;
pub mod nvs;
pub mod time;
pub mod wifi;
