//! Physical input drivers.

pub mod button;
