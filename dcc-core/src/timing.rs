//! Runtime-tunable DCC wire timing, per NMRA S-9.1.
//!
//! The constants are intended to be set once during initialization and
//! read without synchronization thereafter (spec: "Thread-safety of
//! timing constants").

use std::sync::OnceLock;

/// Minimum number of preamble "one" bits accepted by decoders.
pub const PREAMBLE_BITS_MIN: u8 = 14;

/// DCC wire timing and encoding options.
///
/// All durations are in microseconds except [`TimingConfig::packet_separation_ms`],
/// which is in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingConfig {
    /// Half-period of a logical "1" bit. Range 55-61us per NMRA S-9.1.
    pub bit_one_us: u32,
    /// Half-period of a logical "0" bit. Range 95-9900us.
    pub bit_zero_us: u32,
    /// Low-drive duration between packets. Range 5-30ms.
    pub packet_separation_ms: u32,
    /// Number of preamble "one" bits sent before every packet. Minimum 14.
    pub preamble_bits: u8,
    /// When set, speed-and-direction packets use 4 speed bits instead of 5,
    /// freeing one bit for legacy FL/headlight control.
    pub headlight_compat: bool,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            bit_one_us: 55,
            bit_zero_us: 100,
            packet_separation_ms: 15,
            preamble_bits: 16,
            headlight_compat: false,
        }
    }
}

static TIMING: OnceLock<TimingConfig> = OnceLock::new();

/// Installs the process-wide timing configuration.
///
/// Must be called before the first packet is built or sent. Subsequent
/// calls are ignored; the first configuration wins, matching the
/// once-at-init discipline the timing globals are specified to follow.
pub fn configure(config: TimingConfig) {
    let _ = TIMING.set(config);
}

/// Returns the active timing configuration, installing the default one
/// on first use if [`configure`] was never called.
pub fn current() -> TimingConfig {
    *TIMING.get_or_init(TimingConfig::default)
}
