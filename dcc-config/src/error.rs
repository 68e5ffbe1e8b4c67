use thiserror::Error;

/// Errors surfaced while loading or saving a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("locomotive {name:?}: address {address} is reserved (0 is the broadcast address, 255 is reserved)")]
    ReservedAddress { name: String, address: u8 },

    #[error("locomotive {name:?}: speed {speed} exceeds the maximum of {max_speed}")]
    SpeedOutOfRange { name: String, speed: u8, max_speed: u8 },
}
