//! Wire-format primitives for the DCC command station.
//!
//! Implements the NMRA S-9.1/S-9.2/S-9.2.1 bit encoding: packet
//! construction, the XOR checksum, and the microsecond-accurate bit
//! schedule a [`driver::SignalDriver`] replays onto the track.

pub mod direction;
pub mod driver;
pub mod packet;
pub mod timing;

pub use direction::Direction;
pub use driver::SignalDriver;
pub use packet::Packet;
