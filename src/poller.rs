//! Fixed-cadence sampling loop around the MCP3008 driver.

use std::fmt;
use std::io::{self, Write};
use std::time::Duration;

use embedded_hal::spi::SpiDevice;
use log::{debug, info};
use thiserror::Error;

use mcp3008::{Channel, Mcp3008, Reading};

use crate::cancel::CancelToken;

/// Settings the loop runs with, fixed at startup and never mutated.
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    /// Analog input converted on every pass.
    pub channel: Channel,
    /// Pause between consecutive conversions.
    pub interval: Duration,
}

/// Failure that ends the sampling loop early.
#[derive(Debug, Error)]
pub enum PollError<E: fmt::Debug> {
    /// The SPI exchange with the converter failed. A broken bus cannot heal
    /// itself, so the loop gives up rather than retry.
    #[error("SPI transfer failed: {0:?}")]
    Transport(E),
    /// A report line could not be written.
    #[error("failed to write report: {0}")]
    Report(#[from] io::Error),
}

/// Samples `config.channel` once per `config.interval` until `cancel` fires,
/// writing one line per reading to `out`.
///
/// The loop owns the driver, and through it the SPI handle, so the bus is
/// released on every exit path. Readings are reported in order, each with a
/// logical elapsed time of sample index times interval. A zero reading gets
/// a notice line instead of a value: down here it is indistinguishable from
/// a disconnected probe, and suppressing it would hide exactly that.
pub fn run<SPI, W>(
    mut adc: Mcp3008<SPI>,
    config: &PollConfig,
    cancel: &CancelToken,
    out: &mut W,
) -> Result<(), PollError<SPI::Error>>
where
    SPI: SpiDevice,
    W: Write,
{
    writeln!(out, "Starting...")?;

    let mut samples: u64 = 0;
    while !cancel.is_cancelled() {
        let reading = adc.read(config.channel).map_err(PollError::Transport)?;
        let elapsed = config.interval.as_secs_f64() * samples as f64;
        report(out, reading, elapsed)?;
        debug!(
            "sample {} on channel {}: {}",
            samples,
            config.channel as u8,
            reading.value()
        );
        samples += 1;

        if cancel.sleep(config.interval) {
            break;
        }
    }

    info!("cancelled after {} samples", samples);
    writeln!(out, "Cancel")?;
    Ok(())
}

fn report<W: Write>(out: &mut W, reading: Reading, elapsed: f64) -> io::Result<()> {
    if reading.value() != 0 {
        writeln!(out, "Reading: {} at time {} s", reading.value(), elapsed)
    } else {
        writeln!(out, "No reading...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    use embedded_hal::spi::{Error, ErrorKind, ErrorType, Operation};

    use crate::cancel::{self, CancelHandle};

    #[derive(Debug, PartialEq)]
    struct ScriptError;

    impl Error for ScriptError {
        fn kind(&self) -> ErrorKind {
            ErrorKind::Other
        }
    }

    /// SPI stand-in that replays canned response frames and counts usage
    /// through shared handles, so assertions survive the move into the loop.
    struct ScriptedSpi {
        responses: VecDeque<[u8; 3]>,
        transfers: Arc<AtomicUsize>,
        closed: Arc<AtomicUsize>,
        cancel_on_transfer: Option<(usize, CancelHandle)>,
        fail_on_transfer: Option<usize>,
    }

    impl ScriptedSpi {
        fn new(responses: &[[u8; 3]]) -> Self {
            Self {
                responses: responses.iter().copied().collect(),
                transfers: Arc::new(AtomicUsize::new(0)),
                closed: Arc::new(AtomicUsize::new(0)),
                cancel_on_transfer: None,
                fail_on_transfer: None,
            }
        }

        fn counters(&self) -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
            (self.transfers.clone(), self.closed.clone())
        }
    }

    impl Drop for ScriptedSpi {
        fn drop(&mut self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl ErrorType for ScriptedSpi {
        type Error = ScriptError;
    }

    impl SpiDevice for ScriptedSpi {
        fn transaction(
            &mut self,
            operations: &mut [Operation<'_, u8>],
        ) -> Result<(), Self::Error> {
            let nth = self.transfers.fetch_add(1, Ordering::SeqCst) + 1;

            if let Some(failing) = self.fail_on_transfer {
                if nth == failing {
                    return Err(ScriptError);
                }
            }
            if let Some((firing, handle)) = &self.cancel_on_transfer {
                if nth == *firing {
                    handle.cancel();
                }
            }

            match &mut operations[0] {
                Operation::TransferInPlace(words) => {
                    assert_eq!(words[0], 0b0000_0001, "Missing start flag");
                    let reply = self.responses.pop_front().unwrap_or([0, 0, 0]);
                    words.copy_from_slice(&reply);
                }
                _ => panic!("Not an expected operation"),
            }

            Ok(())
        }
    }

    fn config(interval: Duration) -> PollConfig {
        PollConfig {
            channel: Channel::CH7,
            interval,
        }
    }

    #[test]
    fn reports_readings_in_order_with_elapsed_time() {
        let mut spi = ScriptedSpi::new(&[[0, 2, 1], [0, 2, 255], [9, 0, 0]]);
        let (transfers, closed) = spi.counters();
        let (handle, token) = cancel::pair();
        spi.cancel_on_transfer = Some((3, handle));

        let mut out = Vec::new();
        run(
            Mcp3008::new(spi),
            &config(Duration::from_millis(1)),
            &token,
            &mut out,
        )
        .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "Starting...\n\
             Reading: 513 at time 0 s\n\
             Reading: 767 at time 0.001 s\n\
             No reading...\n\
             Cancel\n"
        );
        assert_eq!(transfers.load(Ordering::SeqCst), 3);
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cancellation_before_the_first_sample_never_touches_the_bus() {
        let spi = ScriptedSpi::new(&[]);
        let (transfers, closed) = spi.counters();
        let (handle, token) = cancel::pair();
        handle.cancel();

        let mut out = Vec::new();
        run(
            Mcp3008::new(spi),
            &config(Duration::from_secs(5)),
            &token,
            &mut out,
        )
        .unwrap();

        assert_eq!(transfers.load(Ordering::SeqCst), 0);
        assert_eq!(closed.load(Ordering::SeqCst), 1);
        assert_eq!(String::from_utf8(out).unwrap(), "Starting...\nCancel\n");
    }

    #[test]
    fn cancellation_during_the_pause_cuts_it_short() {
        let spi = ScriptedSpi::new(&[[0, 1, 44]]);
        let (transfers, closed) = spi.counters();
        let (handle, token) = cancel::pair();

        let waker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            handle.cancel();
        });

        let start = Instant::now();
        let mut out = Vec::new();
        run(
            Mcp3008::new(spi),
            &config(Duration::from_secs(60)),
            &token,
            &mut out,
        )
        .unwrap();

        assert!(start.elapsed() < Duration::from_secs(30));
        assert_eq!(transfers.load(Ordering::SeqCst), 1);
        assert_eq!(closed.load(Ordering::SeqCst), 1);

        waker.join().unwrap();
    }

    #[test]
    fn transport_failure_aborts_the_loop() {
        let mut spi = ScriptedSpi::new(&[[0, 0, 10], [0, 0, 20]]);
        let (transfers, closed) = spi.counters();
        spi.fail_on_transfer = Some(3);
        let (_handle, token) = cancel::pair();

        let mut out = Vec::new();
        let err = run(
            Mcp3008::new(spi),
            &config(Duration::from_millis(1)),
            &token,
            &mut out,
        )
        .unwrap_err();

        assert!(matches!(err, PollError::Transport(ScriptError)));
        assert_eq!(transfers.load(Ordering::SeqCst), 3);
        assert_eq!(closed.load(Ordering::SeqCst), 1);

        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "Starting...\n\
             Reading: 10 at time 0 s\n\
             Reading: 20 at time 0.001 s\n"
        );
    }
}
