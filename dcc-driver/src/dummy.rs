use std::sync::Mutex;
use std::time::{Duration, Instant};

use dcc_core::SignalDriver;

struct State {
    last_low: Option<Instant>,
    buffer: String,
}

/// Loopback driver used in tests.
///
/// Measures the elapsed time between a `low()` call and the following
/// `high()` call and classifies it against two thresholds, appending a
/// character to a shared inspection buffer: `"1"` for a logical-one
/// half-period, `"0"` for a logical-zero half-period, or a newline for
/// anything longer (the inter-packet pause).
pub struct DummyDriver {
    one_threshold: Duration,
    zero_threshold: Duration,
    state: Mutex<State>,
}

impl Default for DummyDriver {
    fn default() -> Self {
        Self::new(Duration::from_micros(61), Duration::from_micros(9900))
    }
}

impl DummyDriver {
    /// Creates a dummy driver with custom classification thresholds.
    pub fn new(one_threshold: Duration, zero_threshold: Duration) -> Self {
        Self {
            one_threshold,
            zero_threshold,
            state: Mutex::new(State {
                last_low: None,
                buffer: String::new(),
            }),
        }
    }

    /// Returns a copy of the inspection buffer accumulated so far.
    pub fn buffer(&self) -> String {
        self.state.lock().unwrap().buffer.clone()
    }

    /// Clears the inspection buffer.
    pub fn clear(&self) {
        self.state.lock().unwrap().buffer.clear();
    }
}

impl SignalDriver for DummyDriver {
    fn low(&self) {
        self.state.lock().unwrap().last_low = Some(Instant::now());
    }

    fn high(&self) {
        let mut state = self.state.lock().unwrap();
        let Some(last_low) = state.last_low.take() else {
            return;
        };
        let elapsed = last_low.elapsed();
        let ch = if elapsed < self.one_threshold {
            '1'
        } else if elapsed < self.zero_threshold {
            '0'
        } else {
            '\n'
        };
        state.buffer.push(ch);
    }

    fn tracks_on(&self) {
        log::info!("dummy driver: tracks on");
    }

    fn tracks_off(&self) {
        log::info!("dummy driver: tracks off");
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::thread;

    #[test]
    fn classifies_short_pulse_as_one() {
        let d = DummyDriver::default();
        d.low();
        d.high();
        assert_eq!(d.buffer(), "1");
    }

    #[test]
    fn classifies_long_pause_as_newline() {
        let d = DummyDriver::new(Duration::from_micros(61), Duration::from_micros(500));
        d.low();
        thread::sleep(Duration::from_millis(1));
        d.high();
        assert_eq!(d.buffer(), "\n");
    }
}
