//! Configuration for the SumpIO daemon
//!
//! Loaded from a TOML file. Every field has a default, so a partial file (or
//! no file at all) yields a working deployment on UDP port 32000.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Default UDP port for commands, replies and telemetry
pub const DEFAULT_PORT: u16 = 32000;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub network: NetworkConfig,
    pub transport: TransportConfig,
    pub device: DeviceConfig,
    pub alarms: AlarmConfig,
    pub logging: LoggingConfig,
}

/// UDP socket configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Local address the command socket binds to
    ///
    /// Examples:
    /// - `0.0.0.0:32000` - All interfaces (deployment default)
    /// - `127.0.0.1:0` - Localhost, ephemeral port (tests)
    pub bind_address: String,

    /// Destination of `PAIR=0` announcements while unpaired
    pub broadcast_address: String,

    /// Receive timeout; bounds how long shutdown waits on a blocked receive
    pub read_timeout_ms: u64,
}

/// Pairing and push scheduling
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Interval between push cycles while paired (seconds)
    pub push_period_secs: f64,
    /// Interval between pairing broadcasts while unpaired (seconds)
    pub pair_period_secs: f64,
}

/// Sensor hardware selection and sampling
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Sensor backend ("simulated")
    pub device_type: String,
    /// Interval between sensor samples (seconds)
    pub sensor_period_secs: u64,
}

/// Initial alarm setpoints. Zero disables an alarm.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AlarmConfig {
    /// Relative humidity (%) at or above which the beeper sounds
    pub humidity: i64,
    /// Temperature (°F) at or above which the beeper sounds
    pub temp: i64,
    /// Water distance (inches) at or below which the beeper sounds
    pub distance: i64,
    /// Message the beeper keys out while an alarm is active
    pub beeper_message: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` overrides it
    pub level: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: format!("0.0.0.0:{}", DEFAULT_PORT),
            broadcast_address: format!("255.255.255.255:{}", DEFAULT_PORT),
            read_timeout_ms: 500,
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            push_period_secs: 60.0,
            pair_period_secs: 30.0,
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            device_type: "simulated".to_string(),
            sensor_period_secs: 900,
        }
    }
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            humidity: 0,
            temp: 0,
            distance: 0,
            beeper_message: "SUMP".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl NetworkConfig {
    /// Parsed bind address
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        parse_addr("bind_address", &self.bind_address)
    }

    /// Parsed broadcast destination
    pub fn broadcast_addr(&self) -> Result<SocketAddr> {
        parse_addr("broadcast_address", &self.broadcast_address)
    }

    /// Socket read timeout
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms.max(1))
    }
}

impl TransportConfig {
    /// Initial push period
    pub fn push_period(&self) -> Result<Duration> {
        secs_to_duration("push_period_secs", self.push_period_secs)
    }

    /// Pairing broadcast period
    pub fn pair_period(&self) -> Result<Duration> {
        secs_to_duration("pair_period_secs", self.pair_period_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Example
    /// ```no_run
    /// use sump_io::config::Config;
    ///
    /// let config = Config::load("/etc/sumpio.toml")?;
    /// # Ok::<(), sump_io::Error>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }
}

fn parse_addr(field: &str, value: &str) -> Result<SocketAddr> {
    value
        .parse()
        .map_err(|e| Error::Config(format!("{} '{}': {}", field, value, e)))
}

fn secs_to_duration(field: &str, secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs)
        .ok()
        .filter(|d| !d.is_zero())
        .ok_or_else(|| Error::Config(format!("{} must be positive, got {}", field, secs)))
}
