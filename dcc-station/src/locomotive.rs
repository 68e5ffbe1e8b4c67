use std::fmt;
use std::sync::Arc;

use dcc_core::{Direction, Packet, SignalDriver};

type BoundDriver = Arc<dyn SignalDriver + Send + Sync>;

/// A tracked decoder: its address, throttle state, and the two packets the
/// controller broadcasts for it every sweep.
///
/// The cached packets are rebuilt by [`Locomotive::apply`] whenever an
/// attribute changes; callers that only ever use the setter methods never
/// need to call it directly, since the setters call it for you.
pub struct Locomotive {
    name: String,
    address: u8,
    speed: u8,
    direction: Direction,
    fl: bool,
    f1: bool,
    f2: bool,
    f3: bool,
    f4: bool,
    driver: Option<BoundDriver>,
    speed_packet: Packet,
    fl_packet: Packet,
}

impl Locomotive {
    /// Creates a new locomotive record with no driver bound yet. The two
    /// cached packets are built immediately (as silent-no-op packets until
    /// [`Locomotive::apply`] binds a driver).
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        address: u8,
        speed: u8,
        direction: Direction,
        fl: bool,
        f1: bool,
        f2: bool,
        f3: bool,
        f4: bool,
    ) -> Self {
        let mut loco = Self {
            name: name.into(),
            address,
            speed,
            direction,
            fl,
            f1,
            f2,
            f3,
            f4,
            driver: None,
            speed_packet: Packet::broadcast_idle(None),
            fl_packet: Packet::broadcast_idle(None),
        };
        loco.apply();
        loco
    }

    /// Regenerates the speed-and-direction and function-group-one packets
    /// from the current attributes and bound driver. Must be called after
    /// any attribute change; the setter methods do this automatically.
    ///
    /// Speed masking (5 bits, or 4 when headlight-compat mode is on) is
    /// decided by [`dcc_core::timing::current`], a process-wide setting,
    /// not by anything on this struct.
    pub fn apply(&mut self) {
        self.speed_packet = Packet::speed_and_direction(
            self.driver.clone(),
            self.address,
            self.speed,
            self.direction,
        );
        self.fl_packet = Packet::function_group_one(
            self.driver.clone(),
            self.address,
            self.fl,
            self.f1,
            self.f2,
            self.f3,
            self.f4,
        );
    }

    /// Binds (or rebinds) the driver the cached packets will send on, and
    /// rebuilds them.
    pub fn bind_driver(&mut self, driver: Option<BoundDriver>) {
        self.driver = driver;
        self.apply();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn speed(&self) -> u8 {
        self.speed
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn fl(&self) -> bool {
        self.fl
    }

    pub fn f1(&self) -> bool {
        self.f1
    }

    pub fn f2(&self) -> bool {
        self.f2
    }

    pub fn f3(&self) -> bool {
        self.f3
    }

    pub fn f4(&self) -> bool {
        self.f4
    }

    /// Sets speed (masked to 5 bits, or 4 in headlight-compat mode, per the
    /// process-wide timing config) and rebuilds the cached speed packet.
    pub fn set_speed(&mut self, speed: u8) {
        self.speed = speed;
        self.apply();
    }

    /// Sets direction and rebuilds the cached speed packet.
    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
        self.apply();
    }

    /// Sets all five function flags at once and rebuilds the cached
    /// function-group-one packet.
    pub fn set_functions(&mut self, fl: bool, f1: bool, f2: bool, f3: bool, f4: bool) {
        self.fl = fl;
        self.f1 = f1;
        self.f2 = f2;
        self.f3 = f3;
        self.f4 = f4;
        self.apply();
    }

    /// Sends both cached packets, in order, once each. Repetition is the
    /// caller's (the controller's) responsibility.
    pub fn send(&self) {
        self.speed_packet.send();
        self.fl_packet.send();
    }

    /// Sends the speed-and-direction packet `times` times, then the
    /// function-group-one packet `times` times. DCC decoders only accept a
    /// command after two consecutive identical packets, so the run loop
    /// repeats each packet rather than the pair.
    pub fn send_repeated(&self, times: usize) {
        for _ in 0..times {
            self.speed_packet.send();
        }
        for _ in 0..times {
            self.fl_packet.send();
        }
    }
}

impl Clone for Locomotive {
    fn clone(&self) -> Self {
        let mut loco = Self {
            name: self.name.clone(),
            address: self.address,
            speed: self.speed,
            direction: self.direction,
            fl: self.fl,
            f1: self.f1,
            f2: self.f2,
            f3: self.f3,
            f4: self.f4,
            driver: self.driver.clone(),
            speed_packet: Packet::broadcast_idle(None),
            fl_packet: Packet::broadcast_idle(None),
        };
        loco.apply();
        loco
    }
}

impl fmt::Display for Locomotive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = match self.direction {
            Direction::Forward => ">",
            Direction::Backward => "<",
        };
        let onoff = |v: bool| if v { "on" } else { "off" };
        write!(
            f,
            "{}:{} |{}{}| |{}| |{}|{}|{}|{}|",
            self.name,
            self.address,
            self.speed,
            dir,
            onoff(self.fl),
            onoff(self.f1),
            onoff(self.f2),
            onoff(self.f3),
            onoff(self.f4),
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn to_string_matches_format() {
        let loco = Locomotive::new("Thomas", 3, 10, Direction::Forward, true, false, false, false, false);
        assert_eq!(loco.to_string(), "Thomas:3 |10>| |on| |off|off|off|off|");
    }

    #[test]
    fn setters_rebuild_cached_packets() {
        let mut loco = Locomotive::new("Gordon", 5, 0, Direction::Backward, false, false, false, false, false);
        assert_eq!(loco.speed_packet.data()[0] & 0x1F, 0);
        loco.set_speed(12);
        assert_eq!(loco.speed_packet.data()[0] & 0x1F, 12);
    }

    #[test]
    fn clone_is_independent_snapshot() {
        let mut loco = Locomotive::new("James", 5, 0, Direction::Forward, false, false, false, false, false);
        let snapshot = loco.clone();
        loco.set_speed(20);
        assert_eq!(snapshot.speed(), 0);
        assert_eq!(loco.speed(), 20);
    }
}
