//! SumpIO - Sump pump monitor with a UDP command and telemetry transport
//!
//! This library provides the transport (command table, request handler and
//! data pusher with pairing), the register store it operates on, and the
//! sump application that feeds it sensor readings.

pub mod config;
pub mod core;
pub mod devices;
pub mod error;
pub mod sump;
pub mod transport;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use transport::Transport;
