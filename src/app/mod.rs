//! Application core: pure domain logic, zero I/O.
//!
//! Mode orchestration, credential commits and broker command handling for
//! the node.  All interaction with radios, flash and the clock happens
//! through **port traits** defined in [`ports`], keeping this layer fully
//! testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
