//! Polls a moisture probe on one MCP3008 channel and prints each reading.

use std::io;
use std::time::Duration;

use log::info;
use rppal::spi::{Bus, Mode, SimpleHalSpiDevice, SlaveSelect, Spi};
use simple_signal::{self, Signal};

use mcp3008::{Channel, Mcp3008};

use crate::poller::PollConfig;

mod cancel;
mod poller;

/// Analog input the probe is wired to.
const PROBE_CHANNEL: Channel = Channel::CH7;

/// Pause between consecutive conversions.
const SAMPLE_INTERVAL: Duration = Duration::from_secs(5);

/// SPI clock for the converter; it resolves fine well below its rated limit.
const SPI_CLOCK_HZ: u32 = 1_000_000;

fn main() -> Result<(), anyhow::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let (handle, token) = cancel::pair();
    simple_signal::set_handler(&[Signal::Int, Signal::Term], move |_signals| handle.cancel());

    let spi = Spi::new(Bus::Spi0, SlaveSelect::Ss0, SPI_CLOCK_HZ, Mode::Mode0)?;
    let adc = Mcp3008::new(SimpleHalSpiDevice::new(spi));
    info!(
        "sampling channel {} every {:?} on spidev0.0 at {} Hz",
        PROBE_CHANNEL as u8,
        SAMPLE_INTERVAL,
        SPI_CLOCK_HZ
    );

    let config = PollConfig {
        channel: PROBE_CHANNEL,
        interval: SAMPLE_INTERVAL,
    };

    poller::run(adc, &config, &token, &mut io::stdout())?;
    Ok(())
}
