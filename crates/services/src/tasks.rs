//! Task scope tied to a state holder's lifetime.
//!
//! UI events launch one task each. When the last handle to the owning
//! holder goes away the scope is dropped and every task still running is
//! aborted; the remote call itself is simply abandoned.

use std::future::Future;
use std::sync::Mutex;

use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug)]
pub struct TaskScope {
    shutdown_tx: watch::Sender<bool>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl TaskScope {
    pub fn new() -> Self {
        let (shutdown_tx, _shutdown_rx) = watch::channel(false);
        Self {
            shutdown_tx,
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Spawns `fut` onto the current runtime. The task stops early if the
    /// scope shuts down first.
    pub fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.is_shut_down() {
            tracing::debug!("task scope already shut down, ignoring launch");
            return;
        }
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = shutdown_rx.changed() => {}
                _ = fut => {}
            }
        });
        let mut handles = self.handles.lock().unwrap_or_else(|e| e.into_inner());
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }

    /// Number of launched tasks that have not finished yet.
    pub fn active(&self) -> usize {
        let handles = self.handles.lock().unwrap_or_else(|e| e.into_inner());
        handles.iter().filter(|h| !h.is_finished()).count()
    }

    pub fn is_shut_down(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
        let mut handles = self.handles.lock().unwrap_or_else(|e| e.into_inner());
        for handle in handles.drain(..) {
            handle.abort();
        }
    }
}

impl Default for TaskScope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TaskScope {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn spawned_task_runs_to_completion() {
        let scope = TaskScope::new();
        let done = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&done);
        scope.spawn(async move {
            flag.store(true, Ordering::SeqCst);
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(done.load(Ordering::SeqCst));
        assert_eq!(scope.active(), 0);
    }

    #[tokio::test]
    async fn dropping_scope_abandons_pending_work() {
        let done = Arc::new(AtomicBool::new(false));
        {
            let scope = TaskScope::new();
            let flag = Arc::clone(&done);
            scope.spawn(async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                flag.store(true, Ordering::SeqCst);
            });
            assert_eq!(scope.active(), 1);
        }
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!done.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn launches_after_shutdown_are_ignored() {
        let scope = TaskScope::new();
        scope.shutdown();
        scope.spawn(async {});
        assert_eq!(scope.active(), 0);
        assert!(scope.is_shut_down());
    }
}
