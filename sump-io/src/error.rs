//! Error types for SumpIO

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// SumpIO error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error (socket setup, config file access)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be read or written
    #[error("Configuration error: {0}")]
    Config(String),

    /// Command argument could not be parsed for the target value kind
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Command or push entry references a register the device never created
    #[error("Unknown register: {0}")]
    UnknownRegister(String),

    /// Device type in configuration is not supported
    #[error("Unknown device type: {0}")]
    UnknownDevice(String),

    /// Sensor read failed
    #[error("Sensor error: {0}")]
    Sensor(String),

    /// Worker thread could not be spawned
    #[error("Failed to spawn {name} thread: {source}")]
    ThreadSpawn {
        /// Thread name
        name: &'static str,
        /// Underlying spawn error
        source: std::io::Error,
    },

    /// Worker thread panicked before it could be joined
    #[error("Thread panicked: {0}")]
    ThreadPanic(&'static str),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::Config(e.to_string())
    }
}
