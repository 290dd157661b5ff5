//! Per-document debouncing of validation runs.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tower_lsp::lsp_types::Url;

struct Slot {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Holds at most one pending validation task per document.
///
/// A trigger aborts whatever is pending for the URI and starts a new timer;
/// the task body only runs once the delay passes without another trigger.
/// Once the delay has passed the task leaves its slot, so later triggers
/// start a fresh timer instead of aborting a run in progress.
pub struct ValidationScheduler {
    delay: Duration,
    pending: Arc<Mutex<HashMap<Url, Slot>>>,
    generation: AtomicU64,
}

impl ValidationScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Arc::new(Mutex::new(HashMap::new())),
            generation: AtomicU64::new(0),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `task` to run for `uri` after the debounce delay.
    pub async fn trigger<F>(&self, uri: Url, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let mut pending = self.pending.lock().await;
        if let Some(previous) = pending.remove(&uri) {
            previous.handle.abort();
        }

        let delay = self.delay;
        let slots = Arc::clone(&self.pending);
        let key = uri.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut slots = slots.lock().await;
                if slots.get(&key).is_some_and(|slot| slot.generation == generation) {
                    slots.remove(&key);
                }
            }
            task.await;
        });

        pending.insert(uri, Slot { generation, handle });
    }

    /// Abort the pending task for `uri`. Returns true if one was pending.
    pub async fn cancel(&self, uri: &Url) -> bool {
        match self.pending.lock().await.remove(uri) {
            Some(slot) => {
                slot.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Abort every pending task.
    pub async fn cancel_all(&self) {
        for (_, slot) in self.pending.lock().await.drain() {
            slot.handle.abort();
        }
    }

    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn uri(name: &str) -> Url {
        Url::parse(&format!("file:///tmp/{name}.yaml")).unwrap()
    }

    fn counting_task(counter: &Arc<AtomicUsize>) -> impl Future<Output = ()> + Send + 'static {
        let counter = Arc::clone(counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_rapid_triggers_run_once() {
        let scheduler = ValidationScheduler::new(Duration::from_millis(30));
        let runs = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            scheduler.trigger(uri("a"), counting_task(&runs)).await;
        }
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_documents_are_debounced_independently() {
        let scheduler = ValidationScheduler::new(Duration::from_millis(20));
        let runs = Arc::new(AtomicUsize::new(0));

        scheduler.trigger(uri("a"), counting_task(&runs)).await;
        scheduler.trigger(uri("b"), counting_task(&runs)).await;
        assert_eq!(scheduler.pending_count().await, 2);
        tokio::time::sleep(Duration::from_millis(120)).await;

        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cancel_prevents_run() {
        let scheduler = ValidationScheduler::new(Duration::from_millis(30));
        let runs = Arc::new(AtomicUsize::new(0));

        scheduler.trigger(uri("a"), counting_task(&runs)).await;
        assert!(scheduler.cancel(&uri("a")).await);
        assert!(!scheduler.cancel(&uri("a")).await);
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancel_all() {
        let scheduler = ValidationScheduler::new(Duration::from_millis(30));
        let runs = Arc::new(AtomicUsize::new(0));

        scheduler.trigger(uri("a"), counting_task(&runs)).await;
        scheduler.trigger(uri("b"), counting_task(&runs)).await;
        scheduler.cancel_all().await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.pending_count().await, 0);
    }
}
