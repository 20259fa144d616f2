use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Serializes EDGAR requests so consecutive calls are separated by at least
/// the configured delay, measured from when the previous request completed.
/// The timestamp is the one piece of shared mutable state in the pipeline,
/// so it lives behind a mutex and stays correct if fetches are parallelized.
pub struct RateGate {
    min_interval: Duration,
    last_completed: Mutex<Option<Instant>>,
}

impl RateGate {
    pub fn new(min_interval: Duration) -> Self {
        RateGate {
            min_interval,
            last_completed: Mutex::new(None),
        }
    }

    /// Waits out the remainder of the interval, runs the request, and stamps
    /// its completion time. The lock is held across the request so overlapping
    /// callers queue up instead of racing the stamp.
    pub async fn throttle<T, F>(&self, request: F) -> T
    where
        F: std::future::Future<Output = T>,
    {
        let mut last = self.last_completed.lock().await;
        if let Some(done) = *last {
            let since = done.elapsed();
            if since < self.min_interval {
                tokio::time::sleep(self.min_interval - since).await;
            }
        }
        let out = request.await;
        *last = Some(Instant::now());
        out
    }
}
