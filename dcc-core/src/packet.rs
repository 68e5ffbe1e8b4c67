use std::fmt;
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

use crate::direction::Direction;
use crate::driver::SignalDriver;
use crate::timing;

/// One bit of the DCC wire schedule, represented by which half-period it
/// uses rather than by its boolean value, per the wire invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bit {
    One,
    Zero,
}

/// An immutable DCC packet: address byte, instruction payload, and XOR
/// checksum, plus a lazily materialized bit schedule.
///
/// Constructed exclusively through the factory functions in this module so
/// the `ecc` invariant always holds. A packet may optionally be bound to a
/// [`SignalDriver`]; [`Packet::send`] is a silent no-op when it isn't.
pub struct Packet {
    address: u8,
    data: Vec<u8>,
    ecc: u8,
    driver: Option<Arc<dyn SignalDriver + Send + Sync>>,
    encoded: OnceLock<Vec<Bit>>,
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("address", &self.address)
            .field("data", &self.data)
            .field("ecc", &self.ecc)
            .finish()
    }
}

fn fold_xor(address: u8, data: &[u8]) -> u8 {
    data.iter().fold(address, |acc, b| acc ^ b)
}

impl Packet {
    fn new(
        driver: Option<Arc<dyn SignalDriver + Send + Sync>>,
        address: u8,
        data: Vec<u8>,
    ) -> Self {
        let ecc = fold_xor(address, &data);
        Self {
            address,
            data,
            ecc,
            driver,
            encoded: OnceLock::new(),
        }
    }

    /// Escape hatch: builds a packet from a raw address and payload, with
    /// no masking applied.
    pub fn generic(driver: Option<Arc<dyn SignalDriver + Send + Sync>>, address: u8, data: Vec<u8>) -> Self {
        Self::new(driver, address, data)
    }

    /// Base protocol packet: address is masked to 7 bits.
    pub fn baseline(driver: Option<Arc<dyn SignalDriver + Send + Sync>>, address: u8, data: Vec<u8>) -> Self {
        Self::new(driver, address & 0x7F, data)
    }

    /// Speed-and-direction instruction packet for one locomotive.
    ///
    /// Data byte is `0b01 D S SSSS`: bit 6 set, bit 5 the direction, and
    /// the lower bits the speed (4 bits when headlight-compat mode is
    /// active, 5 bits otherwise).
    pub fn speed_and_direction(
        driver: Option<Arc<dyn SignalDriver + Send + Sync>>,
        address: u8,
        speed: u8,
        direction: Direction,
    ) -> Self {
        let address = address & 0x7F;
        let speed_mask = if timing::current().headlight_compat { 0x0F } else { 0x1F };
        let speed = speed & speed_mask;
        let dir_bit = (u8::from(direction) & 0x1) << 5;
        let ins = (1 << 6) | dir_bit | speed;
        Self::new(driver, address, vec![ins])
    }

    /// Function group one instruction packet (FL + F1..F4) for one locomotive.
    ///
    /// Data byte is `0b100 FL F4 F3 F2 F1`, FL at bit 4.
    pub fn function_group_one(
        driver: Option<Arc<dyn SignalDriver + Send + Sync>>,
        address: u8,
        fl: bool,
        f1: bool,
        f2: bool,
        f3: bool,
        f4: bool,
    ) -> Self {
        let mut ins: u8 = 1 << 7;
        if fl {
            ins |= 1 << 4;
        }
        if f1 {
            ins |= 1 << 0;
        }
        if f2 {
            ins |= 1 << 1;
        }
        if f3 {
            ins |= 1 << 2;
        }
        if f4 {
            ins |= 1 << 3;
        }
        Self::new(driver, address, vec![ins])
    }

    /// Broadcast reset packet: resets all decoders on the bus.
    pub fn broadcast_reset(driver: Option<Arc<dyn SignalDriver + Send + Sync>>) -> Self {
        Self::new(driver, 0x00, vec![0x00])
    }

    /// Broadcast idle packet: keep-alive sent when no locomotives are tracked.
    pub fn broadcast_idle(driver: Option<Arc<dyn SignalDriver + Send + Sync>>) -> Self {
        Self::new(driver, 0xFF, vec![0x00])
    }

    /// Broadcast emergency-stop packet.
    ///
    /// `ignore_direction` sets bit 4 (decoders ignore direction); clearing
    /// `soft_stop` sets bit 0, requesting a hard cut of power rather than a
    /// gentle ramp-down.
    pub fn broadcast_stop(
        driver: Option<Arc<dyn SignalDriver + Send + Sync>>,
        direction: Direction,
        soft_stop: bool,
        ignore_direction: bool,
    ) -> Self {
        let mut speed: u8 = if soft_stop { 0 } else { 1 };
        if ignore_direction {
            speed |= 1 << 4;
        }
        let dir_bit = u8::from(direction) & 0x1;
        let ins = (1 << 6) | (dir_bit << 5) | speed;
        Self::new(driver, 0x00, vec![ins])
    }

    /// Address byte as carried on the wire.
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Instruction payload bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// XOR checksum: `address ^ data[0] ^ .. ^ data[n-1]`.
    pub fn ecc(&self) -> u8 {
        self.ecc
    }

    /// Number of bits the encoded schedule will contain.
    pub fn length(&self) -> usize {
        let preamble = usize::from(timing::current().preamble_bits);
        // preamble + packet-start + address(8) + data bytes (sep+8 each)
        // + ecc-separator + ecc(8) + trailing one
        preamble + 1 + 8 + 9 * self.data.len() + 1 + 8 + 1
    }

    fn build(&self) -> &Vec<Bit> {
        self.encoded.get_or_init(|| {
            let cfg = timing::current();
            let mut bits = Vec::with_capacity(self.length());

            for _ in 0..cfg.preamble_bits {
                bits.push(Bit::One);
            }
            bits.push(Bit::Zero); // packet start
            push_byte(&mut bits, self.address);
            for &b in &self.data {
                bits.push(Bit::Zero); // data-start separator
                push_byte(&mut bits, b);
            }
            bits.push(Bit::Zero); // ecc separator
            push_byte(&mut bits, self.ecc);
            bits.push(Bit::One); // closing bit

            bits
        })
    }

    /// Streams the packet onto the bound driver with microsecond-accurate
    /// timing. A no-op if no driver is bound.
    pub fn send(&self) {
        let Some(driver) = self.driver.as_ref() else {
            log::trace!("send() with no bound driver, skipping");
            return;
        };
        let cfg = timing::current();
        for bit in self.build() {
            let half = match bit {
                Bit::One => Duration::from_micros(u64::from(cfg.bit_one_us)),
                Bit::Zero => Duration::from_micros(u64::from(cfg.bit_zero_us)),
            };
            driver.low();
            busy_wait(half);
            driver.high();
            busy_wait(half);
        }
    }

    /// Drives the output low, sleeps for the inter-packet separation, then
    /// drives it high again.
    pub fn packet_pause(&self) {
        let Some(driver) = self.driver.as_ref() else {
            return;
        };
        let cfg = timing::current();
        driver.low();
        thread::sleep(Duration::from_millis(u64::from(cfg.packet_separation_ms)));
        driver.high();
    }

    /// Renders the bit schedule as a string of `0`s and `1`s, for tests and
    /// debugging.
    pub fn to_bit_string(&self) -> String {
        self.build()
            .iter()
            .map(|b| match b {
                Bit::One => '1',
                Bit::Zero => '0',
            })
            .collect()
    }
}

fn push_byte(bits: &mut Vec<Bit>, byte: u8) {
    for i in 0..8u8 {
        let bit = (byte >> (7 - i)) & 0x1;
        bits.push(if bit == 1 { Bit::One } else { Bit::Zero });
    }
}

/// Busy-waits on the monotonic clock until `dur` elapses.
///
/// Host operating systems cannot reliably sleep for sub-100us intervals,
/// so the run loop polls [`Instant::now`] in a tight loop instead.
fn busy_wait(dur: Duration) {
    let start = Instant::now();
    while start.elapsed() < dur {
        std::hint::spin_loop();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn reset_timing() {
        // TimingConfig is process-wide and set-once; tests rely on the
        // default (16 preamble bits, 55/100us halves) being installed
        // before any other test in the binary calls configure().
        let _ = timing::current();
    }

    #[test]
    fn generic_packet_bit_string() {
        reset_timing();
        let p = Packet::generic(None, 0xFF, vec![0x01]);
        assert_eq!(p.ecc(), 0xFE);
        assert_eq!(
            p.to_bit_string(),
            "11111111111111110111111110000000010111111101"
        );
        assert_eq!(p.to_bit_string().len(), p.length());
    }

    #[test]
    fn baseline_packet_masks_address() {
        reset_timing();
        let p = Packet::baseline(None, 0xFF, vec![0x01]);
        assert_eq!(p.address(), 0x7F);
        assert_eq!(
            p.to_bit_string(),
            "11111111111111110011111110000000010011111101"
        );
    }

    #[test]
    fn broadcast_idle_bit_string() {
        reset_timing();
        let p = Packet::broadcast_idle(None);
        assert_eq!(
            p.to_bit_string(),
            "11111111111111110111111110000000000111111111"
        );
    }

    #[test]
    fn speed_and_direction_bit_string() {
        reset_timing();
        let p = Packet::speed_and_direction(None, 0xFF, 0xFF, Direction::Forward);
        assert_eq!(p.address(), 0x7F);
        assert_eq!(p.ecc(), 0x00);
        assert_eq!(
            p.to_bit_string(),
            "11111111111111110011111110011111110000000001"
        );
    }

    #[test]
    fn function_group_one_bit_string() {
        reset_timing();
        let p = Packet::function_group_one(None, 0xFF, true, true, true, true, true);
        assert_eq!(p.data(), &[0x9F]);
        assert_eq!(p.ecc(), 0x60);
        assert_eq!(
            p.to_bit_string(),
            "11111111111111110111111110100111110011000001"
        );
    }

    #[test]
    fn broadcast_stop_bit_string() {
        reset_timing();
        let p = Packet::broadcast_stop(None, Direction::Backward, true, false);
        assert_eq!(p.data(), &[0x40]);
        assert_eq!(p.ecc(), 0x40);
        assert_eq!(
            p.to_bit_string(),
            "11111111111111110000000000010000000010000001"
        );
    }

    #[test]
    fn ecc_invariant_holds_for_all_factories() {
        reset_timing();
        let packets = vec![
            Packet::generic(None, 0x12, vec![0x34, 0x56]),
            Packet::baseline(None, 0x81, vec![0x01]),
            Packet::speed_and_direction(None, 0x03, 0x0F, Direction::Forward),
            Packet::function_group_one(None, 0x03, true, false, true, false, true),
            Packet::broadcast_reset(None),
            Packet::broadcast_idle(None),
            Packet::broadcast_stop(None, Direction::Forward, false, true),
        ];
        for p in packets {
            assert_eq!(p.ecc(), fold_xor(p.address(), p.data()));
            assert_eq!(p.to_bit_string().len(), p.length());
            assert_eq!(p.build().len(), p.length());
        }
    }

    #[test]
    fn send_with_no_driver_is_a_noop() {
        reset_timing();
        let p = Packet::broadcast_idle(None);
        p.send(); // must not panic or block
    }

    #[test]
    fn build_is_idempotent() {
        reset_timing();
        let p = Packet::generic(None, 0x42, vec![0x01, 0x02]);
        let first = p.to_bit_string();
        let second = p.to_bit_string();
        assert_eq!(first, second);
    }
}
