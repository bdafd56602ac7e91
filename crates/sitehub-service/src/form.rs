//! Form submission helpers: submission deadlines and debounced auto-save.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::{debug, warn};

use sitehub_core::error::{AppError, ErrorCode};
use sitehub_core::result::AppResult;
use sitehub_core::timer::TimerRegistry;

/// Await a form submission, failing with `SUBMIT_TIMEOUT` after `timeout`.
pub async fn submit_with_timeout<T, Fut>(submission: Fut, timeout: Duration) -> AppResult<T>
where
    Fut: Future<Output = AppResult<T>>,
{
    match tokio::time::timeout(timeout, submission).await {
        Ok(result) => result,
        Err(_) => {
            warn!(timeout = ?timeout, "Form submission timed out");
            Err(AppError::timeout(format!(
                "Submission did not complete within {} seconds",
                timeout.as_secs_f32()
            ))
            .with_code(ErrorCode::SubmitTimeout))
        }
    }
}

type SaveFn = Box<dyn FnOnce() -> BoxFuture<'static, AppResult<()>> + Send>;

/// Saves a form draft once edits have stopped for `delay`.
///
/// Each [`touch`](Self::touch) replaces the pending save and restarts the
/// quiet period, so only the latest draft is written.
#[derive(Clone)]
pub struct AutoSaver {
    key: String,
    delay: Duration,
    timers: TimerRegistry,
    pending: Arc<Mutex<Option<SaveFn>>>,
}

impl std::fmt::Debug for AutoSaver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoSaver")
            .field("key", &self.key)
            .field("delay", &self.delay)
            .field("pending", &self.is_pending())
            .finish()
    }
}

impl AutoSaver {
    /// Auto-saver for the form identified by `form_key`.
    pub fn new(timers: TimerRegistry, form_key: &str, delay: Duration) -> Self {
        Self {
            key: format!("autosave:{form_key}"),
            delay,
            timers,
            pending: Arc::new(Mutex::new(None)),
        }
    }

    /// Record an edit; `save` runs after the quiet period unless replaced.
    pub fn touch<F, Fut>(&self, save: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = AppResult<()>> + Send + 'static,
    {
        *self.slot() = Some(Box::new(move || save().boxed()));
        let pending = Arc::clone(&self.pending);
        let key = self.key.clone();
        self.timers.schedule(self.key.clone(), self.delay, move || async move {
            let save = pending.lock().unwrap_or_else(|e| e.into_inner()).take();
            if let Some(save) = save {
                match save().await {
                    Ok(()) => debug!(%key, "Draft auto-saved"),
                    Err(e) => warn!(%key, error = %e, "Auto-save failed"),
                }
            }
        });
    }

    /// Run the pending save now instead of waiting for the timer.
    pub async fn flush(&self) -> AppResult<bool> {
        self.timers.cancel(&self.key);
        let save = self.slot().take();
        match save {
            Some(save) => save().await.map(|()| true),
            None => Ok(false),
        }
    }

    /// Drop the pending save.
    pub fn cancel(&self) -> bool {
        self.timers.cancel(&self.key);
        self.slot().take().is_some()
    }

    /// Whether a save is waiting for the quiet period to end.
    pub fn is_pending(&self) -> bool {
        self.slot().is_some()
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<SaveFn>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitehub_core::error::ErrorKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_submission_times_out() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, AppError>(1)
        };
        let err = submit_with_timeout(slow, Duration::from_secs(30)).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Timeout);
        assert!(err.has_code(ErrorCode::SubmitTimeout));

        let fast = async { Ok::<_, AppError>(7) };
        assert_eq!(submit_with_timeout(fast, Duration::from_secs(30)).await.unwrap(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_autosave_keeps_only_latest_draft() {
        let saver = AutoSaver::new(TimerRegistry::new(), "variation-form", Duration::from_millis(500));
        let saved = Arc::new(Mutex::new(Vec::new()));

        for draft in ["a", "ab", "abc"] {
            let saved = saved.clone();
            saver.touch(move || async move {
                saved.lock().unwrap().push(draft);
                Ok(())
            });
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(saver.is_pending());

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(saved.lock().unwrap().as_slice(), &["abc"]);
        assert!(!saver.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_and_cancel() {
        let saver = AutoSaver::new(TimerRegistry::new(), "task-form", Duration::from_secs(2));
        let count = Arc::new(AtomicUsize::new(0));

        let c = count.clone();
        saver.touch(move || async move {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        assert!(saver.flush().await.unwrap());
        assert!(!saver.flush().await.unwrap());

        let c = count.clone();
        saver.touch(move || async move {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        assert!(saver.cancel());
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
