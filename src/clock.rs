// Clock seam for the dispatch loops
//
// Loops take time through this trait so tests can drive them with a
// virtual clock instead of waiting in real time.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

#[async_trait]
pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> DateTime<Utc>;

    /// Suspend the calling task for `duration`
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock implementation backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
