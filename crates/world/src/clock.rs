//! Injectable time source and cooperative pausing

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Source of sleeps for the polling loops
#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real time via `tokio::time`
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Returns immediately and only tallies the requested time
#[derive(Debug, Default)]
pub struct InstantClock {
    slept_ms: AtomicU64,
}

impl InstantClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total time that would have been slept
    pub fn slept(&self) -> Duration {
        Duration::from_millis(self.slept_ms.load(Ordering::SeqCst))
    }
}

#[async_trait]
impl Clock for InstantClock {
    async fn sleep(&self, duration: Duration) {
        let ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        // the closure never declines, so the update always lands
        let _ = self
            .slept_ms
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |total| {
                Some(total.saturating_add(ms))
            });
        tokio::task::yield_now().await;
    }
}

/// A clock paired with the worker's stop token
#[derive(Clone)]
pub struct Pacer {
    clock: Arc<dyn Clock>,
    stop: CancellationToken,
}

impl Pacer {
    pub fn new(clock: Arc<dyn Clock>, stop: CancellationToken) -> Self {
        Self { clock, stop }
    }

    /// Sleep unless stopped first; `false` means the caller should wind down
    pub async fn pause(&self, duration: Duration) -> bool {
        if self.is_stopped() {
            return false;
        }
        tokio::select! {
            biased;
            _ = self.stop.cancelled() => false,
            _ = self.clock.sleep(duration) => !self.is_stopped(),
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_cancelled()
    }

    pub fn stop_token(&self) -> &CancellationToken {
        &self.stop
    }
}

impl std::fmt::Debug for Pacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pacer")
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_instant_clock_tallies_requested_time() {
        let clock = InstantClock::new();
        clock.sleep(Duration::from_millis(300)).await;
        clock.sleep(Duration::from_secs(1)).await;
        assert_eq!(clock.slept(), Duration::from_millis(1300));
    }

    #[tokio::test]
    async fn test_instant_clock_saturates() {
        let clock = InstantClock::new();
        clock.sleep(Duration::MAX).await;
        clock.sleep(Duration::from_secs(1)).await;
        assert_eq!(clock.slept(), Duration::from_millis(u64::MAX));
    }

    #[tokio::test]
    async fn test_pause_reports_stop() {
        let stop = CancellationToken::new();
        let pacer = Pacer::new(Arc::new(InstantClock::new()), stop.clone());
        assert!(pacer.pause(Duration::from_millis(10)).await);

        stop.cancel();
        assert!(!pacer.pause(Duration::from_millis(10)).await);
        assert!(pacer.is_stopped());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_wakes_on_cancel() {
        let stop = CancellationToken::new();
        let pacer = Pacer::new(Arc::new(TokioClock), stop.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            stop.cancel();
        });

        assert!(!pacer.pause(Duration::from_secs(3600)).await);
        canceller.await.unwrap();
    }
}
