//! Coalesced, rate-limited delivery of change notifications.
//!
//! Every subscription owns one [`Debounced`]. Calling [`Debounced::notify`]
//! marks a delivery as pending in a single-slot buffer; a background thread
//! waits for the rate limiter, takes the pending mark and runs the callback
//! on a fresh thread without waiting for it to finish.
//!
//! With [`RateLimit::Unlimited`] every `notify` produces one delivery and the
//! caller blocks while the slot is occupied. With [`RateLimit::Every`] excess
//! notifications inside one interval are dropped, so a burst collapses into
//! at most one immediate delivery plus one trailing delivery.

use crate::error::Result;
use crossbeam_channel::{bounded, select, Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{trace, warn};

/// Maximum delivery rate of a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimit {
    /// Deliver every notification.
    Unlimited,
    /// Deliver at most once per interval.
    Every(Duration),
}

impl RateLimit {
    /// Rate limit for an optional deduplication interval.
    ///
    /// A missing or zero interval means no coalescing.
    pub fn from_interval(interval: Option<Duration>) -> Self {
        match interval {
            Some(d) if !d.is_zero() => RateLimit::Every(d),
            _ => RateLimit::Unlimited,
        }
    }
}

/// Token bucket with a burst of one.
///
/// The token is spent when a delivery actually happens, so two deliveries
/// are always at least one interval apart, even after an idle stretch.
struct Limiter {
    interval: Duration,
    /// When the next token becomes available.
    next: Option<Instant>,
}

impl Limiter {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: None,
        }
    }

    /// How long until the next token is available.
    fn wait_time(&self) -> Duration {
        self.next
            .map_or(Duration::ZERO, |next| next.saturating_duration_since(Instant::now()))
    }

    /// Spend the token for a delivery happening now.
    fn consume(&mut self) {
        let now = Instant::now();
        let earliest = now + self.interval;
        self.next = Some(self.next.map_or(earliest, |next| next.max(earliest)));
    }
}

type Callback = Arc<dyn Fn() + Send + Sync>;

/// Notify/shutdown pair of one subscription.
pub struct Debounced {
    pending: Sender<()>,
    blocking: bool,
    /// Dropping this sender cancels the background loop.
    cancel: Mutex<Option<Sender<()>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Debounced {
    /// Schedule a delivery.
    ///
    /// Blocks in unlimited mode while a previous notification is still
    /// pending. Never blocks otherwise. A no-op after [`shutdown`].
    ///
    /// [`shutdown`]: Debounced::shutdown
    pub fn notify(&self) {
        if self.blocking {
            // Fails only once the loop has exited.
            let _ = self.pending.send(());
        } else {
            let _ = self.pending.try_send(());
        }
    }

    /// Stop the background loop for good. Idempotent.
    ///
    /// Callbacks already running are not interrupted.
    pub fn shutdown(&self) {
        drop(self.cancel.lock().take());
        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                warn!("debounce loop panicked");
            }
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.lock().is_none()
    }
}

impl Drop for Debounced {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Debounced {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debounced")
            .field("blocking", &self.blocking)
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

/// Wrap `callback` so it runs at most at `limit`.
pub fn debounce<F>(callback: F, limit: RateLimit) -> Result<Debounced>
where
    F: Fn() + Send + Sync + 'static,
{
    let (pending_tx, pending_rx) = bounded(1);
    let (cancel_tx, cancel_rx) = bounded(0);
    let callback: Callback = Arc::new(callback);

    let worker = thread::Builder::new()
        .name("debounce".to_string())
        .spawn(move || run(callback, limit, pending_rx, cancel_rx))?;

    Ok(Debounced {
        pending: pending_tx,
        blocking: limit == RateLimit::Unlimited,
        cancel: Mutex::new(Some(cancel_tx)),
        worker: Mutex::new(Some(worker)),
    })
}

fn is_cancelled(cancel: &Receiver<()>) -> bool {
    matches!(cancel.try_recv(), Err(TryRecvError::Disconnected))
}

fn run(callback: Callback, limit: RateLimit, pending: Receiver<()>, cancel: Receiver<()>) {
    let mut limiter = match limit {
        RateLimit::Every(interval) => Some(Limiter::new(interval)),
        RateLimit::Unlimited => None,
    };

    loop {
        if let Some(limiter) = limiter.as_ref() {
            let delay = limiter.wait_time();
            if !delay.is_zero() {
                match cancel.recv_timeout(delay) {
                    Err(RecvTimeoutError::Timeout) => {}
                    _ => return,
                }
            }
        }

        select! {
            recv(pending) -> msg => {
                if msg.is_err() || is_cancelled(&cancel) {
                    return;
                }
                if let Some(limiter) = limiter.as_mut() {
                    limiter.consume();
                }
                deliver(&callback);
            }
            recv(cancel) -> _ => return,
        }
    }
}

fn deliver(callback: &Callback) {
    let callback = Arc::clone(callback);
    let spawned = thread::Builder::new()
        .name("debounce-deliver".to_string())
        .spawn(move || (*callback)());
    match spawned {
        Ok(_) => trace!("delivery scheduled"),
        Err(err) => warn!(error = %err, "failed to spawn delivery thread, dropping delivery"),
    }
}
