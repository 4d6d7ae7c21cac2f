//! Cooperative cancellation for the sampling loop.
//!
//! The signal handler owns a [`CancelHandle`]; the loop polls its
//! [`CancelToken`]. The pause between samples waits on a channel rather than
//! plain-sleeping, so a request cuts it short instead of running out the
//! full interval.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};

/// Creates a connected handle/token pair.
pub fn pair() -> (CancelHandle, CancelToken) {
    let cancelled = Arc::new(AtomicBool::new(false));
    let (wake_tx, wake_rx) = unbounded();

    (
        CancelHandle {
            cancelled: cancelled.clone(),
            wake: wake_tx,
        },
        CancelToken {
            cancelled,
            wake: wake_rx,
        },
    )
}

/// Requests cancellation. Cheap to clone; safe to fire from any thread.
#[derive(Clone)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
    wake: Sender<()>,
}

impl CancelHandle {
    /// Flags the token and wakes a sleeper. Calling it again is a no-op.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        let _ = self.wake.send(());
    }
}

/// Observed by the loop: reports cancellation and pauses until it arrives.
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    wake: Receiver<()>,
}

impl CancelToken {
    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Pauses for up to `timeout`, woken early by [`CancelHandle::cancel`].
    /// Returns whether cancellation was requested before or during the pause.
    pub fn sleep(&self, timeout: Duration) -> bool {
        if self.is_cancelled() {
            return true;
        }

        match self.wake.recv_timeout(timeout) {
            Ok(()) => true,
            Err(RecvTimeoutError::Timeout) => self.is_cancelled(),
            // Every handle is gone, so no request can arrive later.
            Err(RecvTimeoutError::Disconnected) => {
                self.cancelled.store(true, Ordering::SeqCst);
                true
            }
        }
    }
}
