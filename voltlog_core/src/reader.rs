//! Background line-reading utilities.
//!
//! Spawns a thread that owns the `Link`, forwards newline frames via a
//! bounded channel, and tracks the last-ok timestamp for watchdog logic.
//! The channel provides backpressure: if the consumer falls behind, the
//! producer waits rather than dropping frames.
//!
//! Safety: Each `LineReader` spawns exactly one thread that is shut down
//! when the `LineReader` is dropped, preventing thread leaks.

use crossbeam_channel as xch;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use voltlog_traits::{Clock, Link};

use crate::error::PipelineError;
use crate::link_error::map_link_error;

/// What the reader thread can deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// One newline-terminated frame, already trimmed.
    Line(String),
    /// The transport disconnected; the thread has exited. Terminal.
    Lost,
}

const CHANNEL_CAPACITY: usize = 64;
/// How long a blocked producer waits before re-checking shutdown.
const SEND_POLL: Duration = Duration::from_millis(100);

pub struct LineReader<C: Clock> {
    rx: xch::Receiver<LinkEvent>,
    last_ok: Arc<AtomicU64>,
    epoch: Instant,
    clock: C,
    /// Shutdown flag for immediate response (atomic for lock-free check)
    shutdown: Arc<AtomicBool>,
    /// Join handle for graceful thread cleanup
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl<C: Clock + Clone + Send + Sync + 'static> LineReader<C> {
    pub fn spawn<L: Link + Send + 'static>(mut link: L, read_timeout: Duration, clock: C) -> Self {
        let (tx, rx) = xch::bounded(CHANNEL_CAPACITY);
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let last_ok = Arc::new(AtomicU64::new(0));
        let last_ok_clone = last_ok.clone();
        let epoch = clock.now();
        let thread_clock = clock.clone();

        let join_handle = std::thread::spawn(move || {
            loop {
                if shutdown_clone.load(Ordering::Relaxed) {
                    tracing::debug!("reader thread received shutdown signal");
                    break;
                }

                match link.read_line(read_timeout) {
                    Ok(line) => {
                        if !send_with_shutdown(&tx, LinkEvent::Line(line), &shutdown_clone) {
                            tracing::debug!("reader consumer disconnected, exiting thread");
                            break;
                        }
                        let now = thread_clock.ms_since(epoch);
                        last_ok_clone.store(now, Ordering::Relaxed);
                    }
                    Err(e) => match map_link_error(e.as_ref()) {
                        PipelineError::Timeout => {
                            // Nothing arrived this window; the driver's
                            // stall watchdog decides whether that matters.
                        }
                        err => {
                            tracing::warn!(error = %err, "transport failure in reader thread");
                            let _ = send_with_shutdown(&tx, LinkEvent::Lost, &shutdown_clone);
                            break;
                        }
                    },
                }
            }
            tracing::trace!("reader thread exiting cleanly");
        });

        Self {
            rx,
            last_ok,
            epoch,
            clock,
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    /// Block up to `timeout` for the next event.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<LinkEvent, xch::RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    pub fn stalled_for(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_ok.load(Ordering::Relaxed))
    }

    /// Milliseconds since the last successful read, measured against the
    /// same clock the reader thread stamps `last_ok` with.
    pub fn stalled_for_now(&self) -> u64 {
        self.stalled_for(self.clock.ms_since(self.epoch))
    }
}

/// Send with periodic shutdown checks so a full channel can never wedge
/// the thread against its own Drop. Returns false when the consumer is
/// gone or shutdown was requested while blocked.
fn send_with_shutdown(
    tx: &xch::Sender<LinkEvent>,
    mut ev: LinkEvent,
    shutdown: &AtomicBool,
) -> bool {
    loop {
        match tx.send_timeout(ev, SEND_POLL) {
            Ok(()) => return true,
            Err(xch::SendTimeoutError::Timeout(back)) => {
                if shutdown.load(Ordering::Relaxed) {
                    return false;
                }
                ev = back;
            }
            Err(xch::SendTimeoutError::Disconnected(_)) => return false,
        }
    }
}

impl<C: Clock> Drop for LineReader<C> {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);

        // The thread exits either between reads (flag check) or after the
        // current read_line completes, which is itself bounded by the read
        // timeout.
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => {
                    tracing::trace!("reader thread joined successfully");
                }
                Err(e) => {
                    // Thread panicked; log but don't propagate (we're in Drop)
                    tracing::warn!(?e, "reader thread panicked during shutdown");
                }
            }
        }
    }
}
