//! Shared plumbing for state holders: the three observable outputs every
//! holder exposes, and a scoped wrapper that launches tasks on UI events.

use std::future::Future;
use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use domains::Result;

use crate::observable::Observable;
use crate::tasks::TaskScope;

/// `data`, `is_loading` and `error_message`, as consumed by the UI layer.
pub struct HolderState<T> {
    pub data: Observable<T>,
    pub is_loading: Observable<bool>,
    pub error_message: Observable<Option<String>>,
    pending: Arc<AtomicUsize>,
}

impl<T> Clone for HolderState<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            is_loading: self.is_loading.clone(),
            error_message: self.error_message.clone(),
            pending: Arc::clone(&self.pending),
        }
    }
}

impl<T: Default> Default for HolderState<T> {
    fn default() -> Self {
        Self::with_data(Observable::default())
    }
}

impl<T> HolderState<T> {
    /// Uses an existing cell as `data`, e.g. a remote store's cache.
    pub fn with_data(data: Observable<T>) -> Self {
        Self {
            data,
            is_loading: Observable::new(false),
            error_message: Observable::new(None),
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Marks the holder as the UI having shown the current message.
    pub fn clear_error(&self) {
        self.error_message.set(None);
    }

    /// Publishes a failure without running anything, for checks that fail
    /// before any remote call is made.
    pub fn report(&self, operation: &'static str, error: &domains::DomainError) {
        tracing::warn!(operation, %error, "operation failed");
        self.error_message.set(Some(error.user_message()));
    }

    /// Runs one remote operation: toggles `is_loading` around it and turns
    /// a failure into a logged, user-visible message. `data` is never
    /// touched on failure.
    pub async fn track<R>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = Result<R>>,
    ) -> Option<R> {
        let result = {
            let _loading = LoadingGuard::new(self.is_loading.clone(), Arc::clone(&self.pending));
            fut.await
        };

        match result {
            Ok(value) => Some(value),
            Err(error) => {
                self.report(operation, &error);
                None
            }
        }
    }
}

/// Counts one running operation for as long as it lives. Dropping it, also
/// when the task running the operation is aborted, clears `is_loading`
/// once the last operation is gone.
struct LoadingGuard {
    is_loading: Observable<bool>,
    pending: Arc<AtomicUsize>,
}

impl LoadingGuard {
    fn new(is_loading: Observable<bool>, pending: Arc<AtomicUsize>) -> Self {
        if pending.fetch_add(1, Ordering::SeqCst) == 0 {
            is_loading.set(true);
        }
        Self { is_loading, pending }
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.is_loading.set(false);
        }
    }
}

/// A holder bound to a [`TaskScope`].
///
/// Launched tasks receive a clone of the holder but not of the scope, so
/// once every `Scoped` handle is dropped the scope goes with it and any
/// in-flight task is aborted.
pub struct Scoped<H> {
    holder: H,
    scope: Arc<TaskScope>,
}

impl<H: Clone> Clone for Scoped<H> {
    fn clone(&self) -> Self {
        Self {
            holder: self.holder.clone(),
            scope: Arc::clone(&self.scope),
        }
    }
}

impl<H> Deref for Scoped<H> {
    type Target = H;

    fn deref(&self) -> &H {
        &self.holder
    }
}

impl<H: Clone + Send + Sync + 'static> Scoped<H> {
    pub fn new(holder: H) -> Self {
        Self {
            holder,
            scope: Arc::new(TaskScope::new()),
        }
    }

    /// Fire one task for a UI event; results arrive through the holder's
    /// observables.
    pub fn launch<F, Fut>(&self, f: F)
    where
        F: FnOnce(H) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.scope.spawn(f(self.holder.clone()));
    }

    pub fn active_tasks(&self) -> usize {
        self.scope.active()
    }
}
