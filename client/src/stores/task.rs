//! Subscription lifecycle tracking.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use tokio::task::JoinHandle;

/// Tracks the store's active subscription across reloads.
///
/// Every call to [`begin`](Self::begin) opens a new epoch and invalidates the
/// previous one. Drain tasks carry the epoch they were started under and check
/// it before touching state, so a snapshot from a superseded subscription can
/// never overwrite data from the current one.
#[derive(Debug, Default)]
pub(crate) struct SubscriptionHandle {
    epoch: AtomicU64,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SubscriptionHandle {
    /// Open a new epoch, aborting whatever task the previous one ran.
    ///
    /// Aborting drops the task's subscription, which unregisters its watcher.
    pub(crate) fn begin(&self) -> u64 {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(task) = self.take_task() {
            task.abort();
        }
        epoch
    }

    /// Hand over the drain task started under `epoch`.
    ///
    /// If the epoch was superseded while the task was being set up, the task
    /// is aborted instead of stored.
    pub(crate) fn attach(&self, epoch: u64, task: JoinHandle<()>) {
        if !self.is_current(epoch) {
            task.abort();
            return;
        }
        if let Some(previous) = self.task_slot().replace(task) {
            previous.abort();
        }
    }

    /// Whether `epoch` is still the live one.
    pub(crate) fn is_current(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == epoch
    }

    /// Invalidate the current epoch and stop its task. Idempotent.
    pub(crate) fn stop(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(task) = self.take_task() {
            task.abort();
        }
    }

    fn take_task(&self) -> Option<JoinHandle<()>> {
        self.task_slot().take()
    }

    fn task_slot(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::time::Duration;

    /// Flips a flag when dropped, so tests can observe a task being aborted.
    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    fn flagged_task(flag: &Arc<AtomicBool>) -> JoinHandle<()> {
        let guard = DropFlag(Arc::clone(flag));
        tokio::spawn(async move {
            let _guard = guard;
            std::future::pending::<()>().await
        })
    }

    async fn wait_for(flag: &AtomicBool) {
        for _ in 0..100 {
            if flag.load(Ordering::SeqCst) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("task was not dropped in time");
    }

    #[tokio::test]
    async fn begin_supersedes_previous_epoch() {
        let handle = SubscriptionHandle::default();

        let first = handle.begin();
        assert!(handle.is_current(first));

        let second = handle.begin();
        assert!(!handle.is_current(first));
        assert!(handle.is_current(second));
    }

    #[tokio::test]
    async fn begin_aborts_the_previous_task() {
        let handle = SubscriptionHandle::default();
        let flag = Arc::new(AtomicBool::new(false));

        let epoch = handle.begin();
        handle.attach(epoch, flagged_task(&flag));

        handle.begin();
        wait_for(&flag).await;
    }

    #[tokio::test]
    async fn stale_attach_aborts_immediately() {
        let handle = SubscriptionHandle::default();
        let flag = Arc::new(AtomicBool::new(false));

        let stale = handle.begin();
        handle.begin();

        handle.attach(stale, flagged_task(&flag));
        wait_for(&flag).await;
    }

    #[tokio::test]
    async fn current_attach_keeps_the_task_running() {
        let handle = SubscriptionHandle::default();
        let flag = Arc::new(AtomicBool::new(false));

        let epoch = handle.begin();
        handle.attach(epoch, flagged_task(&flag));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!flag.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let handle = SubscriptionHandle::default();
        let flag = Arc::new(AtomicBool::new(false));

        let epoch = handle.begin();
        handle.attach(epoch, flagged_task(&flag));

        handle.stop();
        handle.stop();
        wait_for(&flag).await;
        assert!(!handle.is_current(epoch));
    }
}
