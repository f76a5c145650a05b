use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("operation timed out after {} ms", .0.as_millis())]
pub struct TimedOut(pub Duration);

/// Bounds a whole operation without cancelling work it has handed off to
/// spawned tasks. Dropping the inner future only drops the caller's side.
#[async_trait]
pub trait OrTimeoutExt {
    type Output;

    async fn or_timeout(self, duration: Duration) -> Result<Self::Output, TimedOut>;
}

#[async_trait]
impl<F> OrTimeoutExt for F
where
    F: Future + Send,
    F::Output: Send,
{
    type Output = F::Output;

    async fn or_timeout(self, duration: Duration) -> Result<Self::Output, TimedOut> {
        tokio::time::timeout(duration, self)
            .await
            .map_err(|_| TimedOut(duration))
    }
}
