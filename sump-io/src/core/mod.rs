//! Core abstractions shared by the transport and the device.
//!
//! - [`driver::SensorDriver`], [`driver::Beeper`]: Traits to implement for new hardware
//! - [`types`]: Register values, cells and the shared register store

pub mod driver;
pub mod types;
