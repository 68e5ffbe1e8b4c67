use num_enum::{FromPrimitive, IntoPrimitive};

/// Locomotive direction of travel.
///
/// Default value is [`Direction::Backward`], matching the zero value of
/// the direction bit on the wire.
#[derive(FromPrimitive, IntoPrimitive, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "u8", into = "u8"))]
#[repr(u8)]
pub enum Direction {
    #[default]
    Backward = 0,
    Forward = 1,
}
