//! Keyed, cancellable one-shot timers.
//!
//! Every delayed behavior in SiteHub goes through a [`TimerRegistry`]:
//! debounced audit refreshes, removal of settled pending actions, and
//! form auto-save. Scheduling a key that is already pending replaces the
//! earlier timer, which is what makes debouncing work. Dropping the owner
//! does not stop timers; call [`TimerRegistry::cancel_all`] on teardown.
//!
//! Timers are spawned on the ambient tokio runtime.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::trace;

#[derive(Debug)]
struct TimerSlot {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Registry of pending timers keyed by name.
#[derive(Debug, Clone, Default)]
pub struct TimerRegistry {
    slots: Arc<Mutex<HashMap<String, TimerSlot>>>,
    generation: Arc<AtomicU64>,
}

impl TimerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` after `delay`, replacing any timer pending under `key`.
    ///
    /// The slot is released before `task` runs, so a task may schedule
    /// its own key again.
    pub fn schedule<F, Fut>(&self, key: impl Into<String>, delay: Duration, task: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let key = key.into();
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let slots = Arc::clone(&self.slots);
        let task_key = key.clone();

        // Held across the spawn so the task cannot look up its slot before it exists.
        let mut map = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut map = slots.lock().unwrap_or_else(|e| e.into_inner());
                match map.get(&task_key) {
                    Some(slot) if slot.generation == generation => {
                        map.remove(&task_key);
                    }
                    _ => return,
                }
            }
            trace!(key = %task_key, "Timer fired");
            task().await;
        });

        if let Some(previous) = map.insert(key, TimerSlot { generation, handle }) {
            previous.handle.abort();
        }
    }

    /// Cancel the timer pending under `key`. Returns `true` if one existed.
    pub fn cancel(&self, key: &str) -> bool {
        let mut map = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        match map.remove(key) {
            Some(slot) => {
                slot.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Cancel every pending timer.
    pub fn cancel_all(&self) -> usize {
        let mut map = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        let count = map.len();
        for (_, slot) in map.drain() {
            slot.handle.abort();
        }
        count
    }

    /// Whether a timer is pending under `key`.
    pub fn is_scheduled(&self, key: &str) -> bool {
        let map = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        map.contains_key(key)
    }

    /// Number of pending timers.
    pub fn len(&self) -> usize {
        let map = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        map.len()
    }

    /// Whether no timers are pending.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter_task(counter: &Arc<AtomicUsize>) -> impl FnOnce() -> std::future::Ready<()> + Send + 'static {
        let counter = Arc::clone(counter);
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_delay() {
        let timers = TimerRegistry::new();
        let fired = Arc::new(AtomicUsize::new(0));
        timers.schedule("a", Duration::from_millis(100), counter_task(&fired));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(timers.is_scheduled("a"));

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(timers.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rescheduling_replaces_previous() {
        let timers = TimerRegistry::new();
        let fired = Arc::new(AtomicUsize::new(0));
        for _ in 0..5 {
            timers.schedule("debounced", Duration::from_millis(100), counter_task(&fired));
            tokio::time::sleep(Duration::from_millis(40)).await;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_and_cancel_all() {
        let timers = TimerRegistry::new();
        let fired = Arc::new(AtomicUsize::new(0));
        timers.schedule("a", Duration::from_millis(10), counter_task(&fired));
        timers.schedule("b", Duration::from_millis(10), counter_task(&fired));
        timers.schedule("c", Duration::from_millis(10), counter_task(&fired));

        assert!(timers.cancel("a"));
        assert!(!timers.cancel("a"));
        assert_eq!(timers.cancel_all(), 2);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
