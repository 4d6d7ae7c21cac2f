use core::fmt;

/// One of the eight single-ended analog inputs of the MCP3008.
///
/// Being an enum, a `Channel` is always in range; code that starts from a
/// raw number goes through [`TryFrom`] and handles [`InvalidChannel`] there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Channel {
    CH0 = 0,
    CH1 = 1,
    CH2 = 2,
    CH3 = 3,
    CH4 = 4,
    CH5 = 5,
    CH6 = 6,
    CH7 = 7,
}

impl Channel {
    /// Iterate over all channels in order.
    pub fn all() -> impl Iterator<Item = Self> {
        [
            Self::CH0,
            Self::CH1,
            Self::CH2,
            Self::CH3,
            Self::CH4,
            Self::CH5,
            Self::CH6,
            Self::CH7,
        ]
        .into_iter()
    }
}

impl TryFrom<u8> for Channel {
    type Error = InvalidChannel;

    fn try_from(n: u8) -> Result<Self, InvalidChannel> {
        match n {
            0 => Ok(Self::CH0),
            1 => Ok(Self::CH1),
            2 => Ok(Self::CH2),
            3 => Ok(Self::CH3),
            4 => Ok(Self::CH4),
            5 => Ok(Self::CH5),
            6 => Ok(Self::CH6),
            7 => Ok(Self::CH7),
            _ => Err(InvalidChannel(n)),
        }
    }
}

/// Error returned when converting an out-of-range number into a [`Channel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidChannel(pub u8);

impl fmt::Display for InvalidChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel {} out of range, MCP3008 inputs are 0-7", self.0)
    }
}
