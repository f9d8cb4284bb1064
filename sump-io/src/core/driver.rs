//! SensorDriver and Beeper trait definitions

use crate::error::Result;

/// One sample of the sump environment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// Relative humidity (%)
    pub humidity_pct: f64,
    /// Air temperature (°F)
    pub temp_f: f64,
    /// Distance from the ranger to the water surface (inches)
    pub distance_in: f64,
}

/// Sensor driver trait for hardware abstraction
///
/// Implementations wrap the humidity/temperature sensor and the ultrasonic
/// ranger. Called from the sampler thread only.
pub trait SensorDriver: Send {
    /// Take one reading from every sensor
    fn sample(&mut self) -> Result<Reading>;
}

/// One segment of a beeper pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tone {
    /// Beeper driven while true, silent otherwise
    pub on: bool,
    /// Segment length in ticks
    pub ticks: u32,
}

/// Audible alarm output
pub trait Beeper: Send {
    /// Play `pattern` to completion
    fn sound(&mut self, pattern: &[Tone]) -> Result<()>;
}
