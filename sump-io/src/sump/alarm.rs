//! Alarm evaluation against the setpoint registers

use super::keys;
use crate::core::driver::Reading;
use crate::core::types::{Registers, Value};
use crate::error::{Error, Result};

/// Which condition raised the alarm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmKind {
    Humidity,
    Temp,
    Distance,
}

/// Alarm setpoints; zero disables the corresponding check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Setpoints {
    pub humidity: i64,
    pub temp: i64,
    pub distance: i64,
}

impl Setpoints {
    pub fn from_registers(registers: &Registers) -> Result<Self> {
        Ok(Self {
            humidity: integer(registers, keys::HUMIDITY_ALARM)?,
            temp: integer(registers, keys::TEMP_ALARM)?,
            distance: integer(registers, keys::DISTANCE_ALARM)?,
        })
    }
}

/// Outcome of applying one reading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmStatus {
    pub triggered: Vec<AlarmKind>,
    /// Beeper message at the time of the reading
    pub message: String,
}

impl AlarmStatus {
    pub fn is_active(&self) -> bool {
        !self.triggered.is_empty()
    }
}

/// Conditions `reading` violates
///
/// Humidity and temperature alarm at or above their setpoint. Distance
/// alarms at or below it, since a shorter distance means higher water.
pub fn evaluate(reading: &Reading, setpoints: &Setpoints) -> Vec<AlarmKind> {
    let mut triggered = Vec::new();
    if setpoints.humidity != 0 && reading.humidity_pct >= setpoints.humidity as f64 {
        triggered.push(AlarmKind::Humidity);
    }
    if setpoints.temp != 0 && reading.temp_f >= setpoints.temp as f64 {
        triggered.push(AlarmKind::Temp);
    }
    if setpoints.distance != 0 && reading.distance_in <= setpoints.distance as f64 {
        triggered.push(AlarmKind::Distance);
    }
    triggered
}

/// Store a reading, evaluate the alarms and update the beeper register
///
/// Must be called with the register lock held so the reading and the
/// beeper state change together.
pub fn apply_reading(registers: &mut Registers, reading: &Reading) -> Result<AlarmStatus> {
    registers.set(keys::HUMIDITY, Value::Float(reading.humidity_pct))?;
    registers.set(keys::TEMP, Value::Float(reading.temp_f))?;
    registers.set(keys::DISTANCE, Value::Float(reading.distance_in))?;

    let setpoints = Setpoints::from_registers(registers)?;
    let triggered = evaluate(reading, &setpoints);
    let beeper = if triggered.is_empty() { "off" } else { "on" };
    registers.set(keys::BEEPER, Value::Text(beeper.to_string()))?;

    let message = registers
        .text(keys::BEEPER_MESSAGE)
        .ok_or_else(|| Error::UnknownRegister(keys::BEEPER_MESSAGE.to_string()))?
        .to_string();

    Ok(AlarmStatus { triggered, message })
}

fn integer(registers: &Registers, key: &str) -> Result<i64> {
    registers
        .integer(key)
        .ok_or_else(|| Error::UnknownRegister(key.to_string()))
}
