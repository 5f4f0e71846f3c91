use std::thread;
use std::time::Duration;

use dlk_store::StoreResult;
use tracing::debug;

/// Bounded wait for a remote peer to index a freshly written entry.
///
/// Only NotFound is retried. After the last attempt one final probe runs
/// and its outcome is returned as is, so the policy never changes which
/// error a caller sees.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
    interval: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_ATTEMPTS: u32 = 20;
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);

    pub fn new(attempts: u32, interval: Duration) -> Self {
        Self { attempts, interval }
    }

    /// Probe once, without waiting.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Upper bound of the time spent sleeping.
    pub fn max_wait(&self) -> Duration {
        self.interval * self.attempts
    }

    pub fn wait_for<T>(&self, mut probe: impl FnMut() -> StoreResult<T>) -> StoreResult<T> {
        for attempt in 1..=self.attempts {
            match probe() {
                Err(e) if e.is_not_found() => {
                    debug!(attempt, max = self.attempts, "entry not visible yet, waiting");
                    thread::sleep(self.interval);
                }
                outcome => return outcome,
            }
        }
        probe()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ATTEMPTS, Self::DEFAULT_INTERVAL)
    }
}
