//! Simulated sump for hardware-free runs and tests
//!
//! The water level rises steadily until the (simulated) float switch runs
//! the pump, which drains the pit back to its low level. Climate is fixed
//! apart from a small humidity sway that tracks the water level.

use crate::core::driver::{Beeper, Reading, SensorDriver, Tone};
use crate::error::Result;

/// Ranger-to-water distance right after the pump runs (inches)
pub const DRAINED_DISTANCE_IN: f64 = 24.0;
/// Distance at which the float switch runs the pump (inches)
pub const PUMP_ON_DISTANCE_IN: f64 = 6.0;
/// Water rise per sample (inches)
pub const RISE_PER_SAMPLE_IN: f64 = 0.5;

const BASE_HUMIDITY_PCT: f64 = 55.0;
const BASE_TEMP_F: f64 = 58.0;

/// Deterministic sump sensors
#[derive(Debug, Clone)]
pub struct SimulatedSensors {
    distance_in: f64,
    pump_cycles: u32,
}

impl SimulatedSensors {
    pub fn new() -> Self {
        Self {
            distance_in: DRAINED_DISTANCE_IN,
            pump_cycles: 0,
        }
    }

    /// Number of times the simulated pump has drained the pit
    pub fn pump_cycles(&self) -> u32 {
        self.pump_cycles
    }
}

impl Default for SimulatedSensors {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorDriver for SimulatedSensors {
    fn sample(&mut self) -> Result<Reading> {
        let reading = Reading {
            // Wetter air as the pit fills
            humidity_pct: BASE_HUMIDITY_PCT
                + (DRAINED_DISTANCE_IN - self.distance_in) * 0.5,
            temp_f: BASE_TEMP_F,
            distance_in: self.distance_in,
        };

        self.distance_in -= RISE_PER_SAMPLE_IN;
        if self.distance_in <= PUMP_ON_DISTANCE_IN {
            log::debug!("Simulated pump cycle at {:.1}in", self.distance_in);
            self.distance_in = DRAINED_DISTANCE_IN;
            self.pump_cycles += 1;
        }

        Ok(reading)
    }
}

/// Beeper that logs patterns instead of driving a GPIO
#[derive(Debug, Default)]
pub struct SimulatedBeeper {
    patterns_played: usize,
}

impl SimulatedBeeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn patterns_played(&self) -> usize {
        self.patterns_played
    }
}

impl Beeper for SimulatedBeeper {
    fn sound(&mut self, pattern: &[Tone]) -> Result<()> {
        let on_ticks: u32 = pattern.iter().filter(|t| t.on).map(|t| t.ticks).sum();
        let total_ticks: u32 = pattern.iter().map(|t| t.ticks).sum();
        log::info!(
            "Beeper: {} segments, {} of {} ticks sounding",
            pattern.len(),
            on_ticks,
            total_ticks
        );
        self.patterns_played += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_water_rises_each_sample() {
        let mut sensors = SimulatedSensors::new();
        let first = sensors.sample().unwrap();
        let second = sensors.sample().unwrap();

        assert_relative_eq!(first.distance_in, DRAINED_DISTANCE_IN);
        assert_relative_eq!(second.distance_in, DRAINED_DISTANCE_IN - RISE_PER_SAMPLE_IN);
        assert!(second.humidity_pct > first.humidity_pct);
        assert_relative_eq!(second.temp_f, BASE_TEMP_F);
    }

    #[test]
    fn test_pump_drains_pit() {
        let mut sensors = SimulatedSensors::new();
        let samples_to_pump =
            ((DRAINED_DISTANCE_IN - PUMP_ON_DISTANCE_IN) / RISE_PER_SAMPLE_IN) as usize;

        let mut lowest = f64::MAX;
        for _ in 0..samples_to_pump {
            lowest = lowest.min(sensors.sample().unwrap().distance_in);
        }
        assert_eq!(sensors.pump_cycles(), 1);
        assert!(lowest > PUMP_ON_DISTANCE_IN);

        let after = sensors.sample().unwrap();
        assert_relative_eq!(after.distance_in, DRAINED_DISTANCE_IN);
    }

    #[test]
    fn test_deterministic() {
        let mut a = SimulatedSensors::new();
        let mut b = SimulatedSensors::new();
        for _ in 0..50 {
            assert_eq!(a.sample().unwrap(), b.sample().unwrap());
        }
    }

    #[test]
    fn test_beeper_counts_patterns() {
        let mut beeper = SimulatedBeeper::new();
        beeper
            .sound(&[Tone { on: true, ticks: 2 }, Tone { on: false, ticks: 2 }])
            .unwrap();
        assert_eq!(beeper.patterns_played(), 1);
    }
}
