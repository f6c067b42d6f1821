use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

/// Time source for outbound pacing.
///
/// Production uses [`TokioClock`]; tests inject a virtual clock so pacing can
/// be asserted without real sleeps.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    async fn sleep(&self, duration: Duration);
}

#[derive(Clone, Copy, Debug, Default)]
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
