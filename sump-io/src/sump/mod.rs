//! Sump monitor: registers, command table and push list
//!
//! Wires the sensor sampler to the transport. The transport sees only the
//! register store, the device command entries and the push list built here.

pub mod alarm;
pub mod morse;
pub mod sampler;

pub use sampler::{Sampler, SamplerSignal, ScanTrigger};

use crate::config::{AlarmConfig, DeviceConfig};
use crate::core::types::{Cell, Registers, Value};
use crate::error::Result;
use crate::transport::{CommandEntry, PushEntry, PushList, Request, no_argument};

/// Register keys
pub mod keys {
    pub const HUMIDITY: &str = "humidity_pct";
    pub const TEMP: &str = "temp_f";
    pub const DISTANCE: &str = "distance_in";
    /// `on` while any alarm is active
    pub const BEEPER: &str = "beeper";
    pub const HUMIDITY_ALARM: &str = "humidity_alarm";
    pub const TEMP_ALARM: &str = "temp_alarm";
    pub const DISTANCE_ALARM: &str = "distance_alarm";
    pub const BEEPER_MESSAGE: &str = "beeper_message";
    /// Seconds between samples; zero or negative pauses periodic sampling
    pub const SENSOR_PERIOD: &str = "sensor_period";
}

/// Register store seeded from configuration
///
/// Readings start at zero until the first sample.
pub fn create_registers(alarms: &AlarmConfig, device: &DeviceConfig) -> Registers {
    let mut registers = Registers::new();
    registers.define(keys::HUMIDITY, Value::Float(0.0));
    registers.define(keys::TEMP, Value::Float(0.0));
    registers.define(keys::DISTANCE, Value::Float(0.0));
    registers.define(keys::BEEPER, Value::Text("off".to_string()));
    registers.define(keys::HUMIDITY_ALARM, Value::Integer(alarms.humidity));
    registers.define(keys::TEMP_ALARM, Value::Integer(alarms.temp));
    registers.define(keys::DISTANCE_ALARM, Value::Integer(alarms.distance));
    registers.define(
        keys::BEEPER_MESSAGE,
        Value::Text(alarms.beeper_message.clone()),
    );
    registers.define(
        keys::SENSOR_PERIOD,
        Value::Integer(i64::try_from(device.sensor_period_secs).unwrap_or(i64::MAX)),
    );
    registers
}

/// Device command entries, matched after the transport built-ins
pub fn device_commands(scan: ScanTrigger) -> Vec<CommandEntry> {
    vec![
        CommandEntry::cell("GETHUMIDITY", "HUMIDITY", Cell::float(keys::HUMIDITY)),
        CommandEntry::cell("GETTEMP", "TEMP", Cell::float(keys::TEMP)),
        CommandEntry::cell("GETDISTANCE", "DISTANCE", Cell::float(keys::DISTANCE)),
        CommandEntry::cell("GETBEEPER", "BEEPER", Cell::text(keys::BEEPER)),
        CommandEntry::cell(
            "SETHUMIDITYALARM",
            "HUMIDITYALARM",
            Cell::integer(keys::HUMIDITY_ALARM),
        ),
        CommandEntry::cell("SETTEMPALARM", "TEMPALARM", Cell::integer(keys::TEMP_ALARM)),
        CommandEntry::cell(
            "SETDISTANCEALARM",
            "DISTANCEALARM",
            Cell::integer(keys::DISTANCE_ALARM),
        ),
        CommandEntry::cell("SETBEEPERMSG", "BEEPERMSG", Cell::text(keys::BEEPER_MESSAGE)),
        CommandEntry::cell(
            "SETSENSORPERIOD",
            "SENSORPERIOD",
            Cell::integer(keys::SENSOR_PERIOD),
        ),
        CommandEntry::handler("SCAN", "SCAN", move |req: &Request<'_>| -> Result<String> {
            no_argument(req, "SCAN")?;
            scan.trigger();
            Ok("1".to_string())
        }),
    ]
}

/// Fields of every push cycle, in order
pub fn push_list() -> PushList {
    vec![
        PushEntry::new("HUMIDITY", Cell::float(keys::HUMIDITY)),
        PushEntry::new("TEMP", Cell::float(keys::TEMP)),
        PushEntry::new("DISTANCE", Cell::float(keys::DISTANCE)),
        PushEntry::new("BEEPER", Cell::text(keys::BEEPER)),
    ]
}
