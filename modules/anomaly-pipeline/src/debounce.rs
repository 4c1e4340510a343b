use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Restart-on-call debouncer: each [`trigger`](Self::trigger) resets the
/// quiet period; the action only runs once no call has arrived for
/// `duration`. Equivalent to resetting a single shared timer rather than
/// spawning one per call.
pub struct Debouncer {
    duration: Duration,
    generation: Arc<AtomicU64>,
}

impl Debouncer {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn trigger<F, Fut>(&self, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let target = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = self.generation.clone();
        let duration = self.duration;
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            if generation.load(Ordering::SeqCst) == target {
                action().await;
            }
        });
    }
}
