//! Driver for the Microchip MCP3008 10-bit ADC via the `embedded-hal` ecosystem.
//!
//! Every conversion is a single full-duplex 3-byte exchange with chip select
//! asserted across the whole frame (datasheet figure 6-1):
//!
//! * byte 0 is `0x01`, the start bit that opens the conversion handshake;
//! * byte 1 carries, in its upper nibble, the single-ended/differential
//!   flag and the 3-bit channel number, shifted up because the ADC latches
//!   the command bits one clock past the frame boundary;
//! * byte 2 is don't-care padding that keeps the clock running while the
//!   result shifts out.
//!
//! The response carries the reading in the low 2 bits of byte 1 and all of
//! byte 2; byte 0 correlates with the start-bit echo and is discarded. The
//! decoder masks to 10 bits, so a [`Reading`] always lies in `0..=1023`.

#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_code)]

use embedded_hal::spi::SpiDevice;

mod channel;

pub use channel::{Channel, InvalidChannel};

/// Start bit that opens every conversion handshake.
const START: u8 = 0b0000_0001;

/// A decoded conversion result.
///
/// Only the driver constructs these, so the 10-bit range invariant holds by
/// construction. A reading of 0 is a legitimate result: at this layer it is
/// indistinguishable from a disconnected or floating input, and the driver
/// leaves that distinction to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Reading(u16);

impl Reading {
    /// Full-scale value of the 10-bit converter.
    pub const MAX: Reading = Reading(1023);

    /// The raw digital value, `0..=1023`.
    pub const fn value(self) -> u16 {
        self.0
    }
}

/// Builds the 3-byte command frame for one conversion.
const fn command(channel: Channel, single_ended: bool) -> [u8; 3] {
    let mode = if single_ended { 0b1000 } else { 0b0000 };
    [START, (mode | channel as u8) << 4, 0b0000_0000]
}

/// Extracts the 10-bit result from a 3-byte response frame.
const fn decode(frame: [u8; 3]) -> Reading {
    Reading((((frame[1] & 0b0000_0011) as u16) << 8) | frame[2] as u16)
}

/// MCP3008 driver.
pub struct Mcp3008<SPI> {
    spi: SPI,
}

impl<SPI: SpiDevice> Mcp3008<SPI> {
    /// Creates a new driver from an SPI peripheral.
    /// Please ensure the SPI bus is in SPI mode 0, aka (0, 0).
    pub fn new(spi: SPI) -> Self {
        spi.into()
    }

    /// Consumes the driver and hands the SPI peripheral back.
    pub fn release(self) -> SPI {
        self.spi
    }

    /// Samples a channel in single-ended mode and returns the 10-bit value.
    ///
    /// Exactly one bus transaction takes place per call; there is no
    /// retrying and no caching, and a failed transfer surfaces as the SPI
    /// peripheral's own error, untouched.
    pub fn read(&mut self, channel: Channel) -> Result<Reading, SPI::Error> {
        self.convert(channel, true)
    }

    /// Samples with the mode flag clear, selecting the chip's differential
    /// pair arrangement for `channel` (see datasheet table 5-2).
    pub fn read_differential(&mut self, channel: Channel) -> Result<Reading, SPI::Error> {
        self.convert(channel, false)
    }

    fn convert(&mut self, channel: Channel, single_ended: bool) -> Result<Reading, SPI::Error> {
        let mut frame = command(channel, single_ended);
        self.spi.transfer_in_place(&mut frame)?;
        Ok(decode(frame))
    }
}

impl<SPI: SpiDevice> From<SPI> for Mcp3008<SPI> {
    fn from(spi: SPI) -> Self {
        Self { spi }
    }
}
