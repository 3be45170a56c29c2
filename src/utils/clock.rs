use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use tokio::time::Instant;

/// Represents an entity responsible for providing dates and monotonic time across the
/// application. This allows the tracker to be driven by a fake clock during testing.
#[async_trait]
pub trait Clock: Sync + Send + 'static {
    /// Current calendar date in the local timezone.
    fn today(&self) -> NaiveDate;

    fn instant(&self) -> Instant;

    async fn sleep(&self, duration: Duration);
}

pub struct DefaultClock;

#[async_trait]
impl Clock for DefaultClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    fn instant(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Whole seconds between two instants, rounded up. A baseline that is somehow ahead of `now`
/// yields zero.
pub fn elapsed_whole_seconds(baseline: Instant, now: Instant) -> u64 {
    let elapsed = now.saturating_duration_since(baseline);
    let whole = elapsed.as_secs();
    if elapsed.subsec_nanos() > 0 {
        whole + 1
    } else {
        whole
    }
}
