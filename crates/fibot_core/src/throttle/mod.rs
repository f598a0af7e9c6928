use std::time::{Duration, Instant};

use crate::error::AppError;

/// Minimum spacing between calls to the hosted model.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(2);

/// Rejects a request that arrives within `min_interval` of the last admitted one.
///
/// Rejected requests do not move the window.
#[derive(Debug, Clone)]
pub struct Throttle {
    min_interval: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: None,
        }
    }

    pub fn admit(&mut self) -> Result<(), AppError> {
        self.admit_at(Instant::now())
    }

    pub fn admit_at(&mut self, now: Instant) -> Result<(), AppError> {
        if let Some(last) = self.last {
            let since = now.saturating_duration_since(last);
            if since < self.min_interval {
                let wait = self.min_interval - since;
                return Err(AppError::new(
                    "THROTTLED",
                    format!("Please wait {} seconds...", self.min_interval.as_secs().max(1)),
                )
                .with_details(format!("retry_in_ms={}", wait.as_millis()))
                .with_retryable(true));
            }
        }
        self.last = Some(now);
        Ok(())
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL)
    }
}
