use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::core::model::Warning;
use crate::core::EngineError;

/// Shared cancellation signal. Cloning yields a handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Clear the flag so the same handles can drive another run.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// Apply an async operation to every item under a concurrency cap.
///
/// At most `max_concurrency` invocations run at once, gated by a counting
/// semaphore. Each invocation receives a progress fraction computed from a
/// shared completion counter, so progress is monotonic regardless of
/// completion order. A failing item becomes a `Warning` in the output without
/// cancelling its siblings; only `cancel` aborts the whole map.
///
/// The output order follows task completion, not input order. Callers that
/// need a stable order must restore it themselves.
pub async fn bounded_parallel_map<T, R, F, Fut>(
    items: Vec<T>,
    max_concurrency: usize,
    cancel: &CancelFlag,
    op: F,
) -> Result<Vec<Result<R, Warning>>, EngineError>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T, f32) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<R, Warning>> + Send,
{
    let total = items.len();
    let semaphore = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let counter = Arc::new(AtomicUsize::new(0));

    let mut tasks: JoinSet<Option<Result<R, Warning>>> = JoinSet::new();
    for item in items {
        let semaphore = Arc::clone(&semaphore);
        let counter = Arc::clone(&counter);
        let cancel = cancel.clone();
        let op = op.clone();
        tasks.spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return None,
            };
            if cancel.is_cancelled() {
                return None;
            }
            let progress = (counter.fetch_add(1, Ordering::Relaxed) + 1) as f32 / total as f32;
            Some(op(item, progress).await)
        });
    }

    let mut results = Vec::with_capacity(total);
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Some(result)) => results.push(result),
            Ok(None) => {}
            Err(e) => log::warn!("Worker task failed to join: {e}"),
        }
    }

    if cancel.is_cancelled() {
        return Err(EngineError::Cancelled);
    }
    Ok(results)
}
