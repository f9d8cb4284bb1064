//! Device implementations

pub mod simulated;

use crate::config::Config;
use crate::core::driver::{Beeper, SensorDriver};
use crate::error::{Error, Result};
use simulated::{SimulatedBeeper, SimulatedSensors};

/// Create the sensor driver based on configuration
pub fn create_sensors(config: &Config) -> Result<Box<dyn SensorDriver>> {
    match config.device.device_type.as_str() {
        "simulated" => Ok(Box::new(SimulatedSensors::new())),
        _ => Err(Error::UnknownDevice(config.device.device_type.clone())),
    }
}

/// Create the beeper based on configuration
pub fn create_beeper(config: &Config) -> Result<Box<dyn Beeper>> {
    match config.device.device_type.as_str() {
        "simulated" => Ok(Box::new(SimulatedBeeper::new())),
        _ => Err(Error::UnknownDevice(config.device.device_type.clone())),
    }
}
