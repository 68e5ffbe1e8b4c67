use thiserror::Error;

/// Errors surfaced while initializing a hardware signal driver.
#[derive(Debug, Error)]
pub enum DriverError {
    #[cfg(feature = "gpio")]
    #[error("failed to open GPIO chip: {0}")]
    Gpio(#[from] rppal::gpio::Error),
}
