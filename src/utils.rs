//! Runtime utilities shared by the signalling layer.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio::task::JoinHandle;

/// One-shot delayed task with cancellation.
///
/// The countdown starts immediately on construction. Firing and
/// [`Timer::cancel`] race; an atomic compare-exchange decides the winner,
/// so the task runs at most once and `cancel` reports truthfully whether
/// it prevented the run.
#[derive(Debug)]
pub struct Timer {
    /// Set once the race between firing and cancellation is decided.
    resolved: Arc<AtomicBool>,

    /// Handle of the spawned countdown task.
    handle: JoinHandle<()>,
}

impl Timer {
    /// Spawns a countdown running `task` after `delay`.
    pub fn new<F>(delay: Duration, task: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let resolved = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&resolved);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if flag
                .compare_exchange(
                    false,
                    true,
                    Ordering::SeqCst,
                    Ordering::SeqCst,
                )
                .is_ok()
            {
                task();
            }
        });
        Self { resolved, handle }
    }

    /// Attempts to prevent the task from running.
    ///
    /// Returns `true` if cancellation beat the firing. When it returns
    /// `false` the task either already ran or is running right now.
    pub fn cancel(&self) -> bool {
        let won = self
            .resolved
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if won {
            self.handle.abort();
        }
        won
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_rt::test]
    async fn fires_once_after_delay() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);

        let _timer = Timer::new(Duration::from_millis(10), move || {
            flag.store(true, Ordering::SeqCst);
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(fired.load(Ordering::SeqCst));
    }

    #[actix_rt::test]
    async fn cancel_beats_firing() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);

        let timer = Timer::new(Duration::from_secs(60), move || {
            flag.store(true, Ordering::SeqCst);
        });

        assert!(timer.cancel());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!fired.load(Ordering::SeqCst));
    }

    #[actix_rt::test]
    async fn cancel_after_firing_reports_loss() {
        let timer = Timer::new(Duration::from_millis(5), || {});
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(!timer.cancel());
    }
}
