//! Randomized inter-request delay
//!
//! Every pipeline waits a random time between requests. The wait listens on
//! a shutdown channel so Ctrl-C ends it early instead of sleeping it out.

use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Inclusive range of delays, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    min_ms: u64,
    max_ms: u64,
}

impl DelayRange {
    /// Creates a range; bounds given in the wrong order are swapped
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self {
            min_ms: min_ms.min(max_ms),
            max_ms: min_ms.max(max_ms),
        }
    }

    /// A range that never waits
    pub fn none() -> Self {
        Self::new(0, 0)
    }

    pub fn min_ms(&self) -> u64 {
        self.min_ms
    }

    pub fn max_ms(&self) -> u64 {
        self.max_ms
    }

    /// Picks a delay uniformly from the range
    pub fn sample(&self) -> Duration {
        if self.min_ms == self.max_ms {
            return Duration::from_millis(self.min_ms);
        }
        Duration::from_millis(rand::random_range(self.min_ms..=self.max_ms))
    }
}

/// How a pause ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseOutcome {
    /// The full delay elapsed
    Elapsed,
    /// Shutdown was requested before or during the delay
    Interrupted,
}

/// Applies a random delay, cut short by a shutdown signal
///
/// The signal is a `watch` channel carrying `true` once shutdown has been
/// requested. A dropped sender means nobody can interrupt any more; pauses
/// then always run to completion.
#[derive(Debug, Clone)]
pub struct Throttle {
    range: DelayRange,
    shutdown: watch::Receiver<bool>,
}

impl Throttle {
    pub fn new(range: DelayRange, shutdown: watch::Receiver<bool>) -> Self {
        Self { range, shutdown }
    }

    /// A throttle nothing can interrupt
    pub fn uninterruptible(range: DelayRange) -> Self {
        let (_, shutdown) = watch::channel(false);
        Self::new(range, shutdown)
    }

    /// Returns true once shutdown has been requested
    pub fn is_interrupted(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Waits a random delay from the range
    pub async fn pause(&mut self) -> PauseOutcome {
        self.pause_for(self.range.sample()).await
    }

    /// Waits exactly `delay` unless shutdown is requested first
    pub async fn pause_for(&mut self, delay: Duration) -> PauseOutcome {
        if self.is_interrupted() {
            return PauseOutcome::Interrupted;
        }
        if delay.is_zero() {
            return PauseOutcome::Elapsed;
        }

        tracing::debug!("Waiting {} ms before next request", delay.as_millis());

        let deadline = Instant::now() + delay;
        let interrupted = tokio::select! {
            _ = tokio::time::sleep_until(deadline) => false,
            changed = self.shutdown.wait_for(|stop| *stop) => changed.is_ok(),
        };

        if interrupted {
            tracing::info!("Delay interrupted by shutdown request");
            return PauseOutcome::Interrupted;
        }

        // The sender went away mid-pause; finish the remaining time.
        tokio::time::sleep_until(deadline).await;
        PauseOutcome::Elapsed
    }
}
