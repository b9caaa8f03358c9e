//! Time source for the wait monitor
//!
//! The monitor never reads the system clock or sleeps directly. Production
//! code uses [`TokioClock`]; tests inject a clock that advances on demand.

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;

/// Monotonic time source with an async sleep
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current monotonic instant
    fn now(&self) -> Instant;

    /// Suspends the caller for `duration`
    async fn sleep(&self, duration: Duration);
}

/// Clock backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
