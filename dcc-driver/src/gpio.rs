use rppal::gpio::{Gpio, OutputPin};
use std::sync::Mutex;

use dcc_core::SignalDriver;

use crate::error::DriverError;

/// Default signal pin, matching the original Raspberry Pi reference driver.
pub const DEFAULT_SIGNAL_PIN: u8 = 17;
/// Default brake pin, matching the original Raspberry Pi reference driver.
pub const DEFAULT_BRAKE_PIN: u8 = 27;

/// Raspberry Pi GPIO driver.
///
/// Drives a signal pin directly with the DCC bit stream and a brake pin
/// that gates the booster: brake high means tracks off, brake low means
/// tracks on.
pub struct GpioDriver {
    signal: Mutex<OutputPin>,
    brake: Mutex<OutputPin>,
}

impl GpioDriver {
    /// Opens the GPIO chip and configures `signal_pin`/`brake_pin` as
    /// outputs. Tracks start de-energized (brake pin high).
    pub fn new(signal_pin: u8, brake_pin: u8) -> Result<Self, DriverError> {
        let gpio = Gpio::new()?;
        let mut signal = gpio.get(signal_pin)?.into_output();
        let mut brake = gpio.get(brake_pin)?.into_output();
        signal.set_low();
        brake.set_high();
        Ok(Self {
            signal: Mutex::new(signal),
            brake: Mutex::new(brake),
        })
    }

    /// Opens the GPIO chip with the original reference driver's default
    /// pin assignments.
    pub fn new_default() -> Result<Self, DriverError> {
        Self::new(DEFAULT_SIGNAL_PIN, DEFAULT_BRAKE_PIN)
    }
}

impl SignalDriver for GpioDriver {
    fn low(&self) {
        self.signal.lock().unwrap().set_low();
    }

    fn high(&self) {
        self.signal.lock().unwrap().set_high();
    }

    fn tracks_on(&self) {
        log::info!("gpio driver: tracks on");
        self.brake.lock().unwrap().set_low();
    }

    fn tracks_off(&self) {
        log::info!("gpio driver: tracks off");
        self.brake.lock().unwrap().set_high();
    }
}
