//! FieldNode firmware library.
//!
//! A sensor node that is provisioned over BLE, then joins Wi-Fi and keeps
//! an MQTT session to a broker.  Exposes the pure-logic modules for
//! integration testing.  All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod fsm;
pub mod provisioning;
pub mod store;
pub mod supervisor;
pub mod text;

pub mod adapters;
pub mod drivers;
