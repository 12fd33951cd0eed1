//! Observable state cells built on `tokio::sync::watch`.
//!
//! A watch channel keeps exactly one value: readers always see the latest
//! write and intermediate states are never buffered. That gives "state"
//! semantics rather than "event" semantics, which is what a UI binding wants.

use std::fmt;

use tokio::sync::watch;

/// A single observable value. `Clone` shares the same underlying cell.
pub struct Observable<T> {
    tx: watch::Sender<T>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Observable").field(&*self.tx.borrow()).finish()
    }
}

impl<T: Default> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Observable<T> {
    pub fn new(initial: T) -> Self {
        // `watch::Sender::new` keeps the channel open with zero receivers,
        // so publishing never fails while nobody is subscribed.
        Self {
            tx: watch::Sender::new(initial),
        }
    }

    /// Replaces the value and wakes every subscriber.
    pub fn set(&self, value: T) {
        self.tx.send_replace(value);
    }

    /// Mutates the value in place and wakes every subscriber.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.tx.send_modify(f);
    }

    /// Returns a receiver positioned at the current value. Dropping it
    /// unsubscribes.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }

    /// Runs `f` against the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.tx.borrow())
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl<T: Clone> Observable<T> {
    /// Snapshot of the current value.
    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }
}

/// The current displayed list of entities.
///
/// Every fetch replaces the whole collection; there is no incremental
/// patching, so element order is whatever the last fetch returned.
pub struct ObservableCollection<T> {
    inner: Observable<Vec<T>>,
}

impl<T> Clone for ObservableCollection<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Default for ObservableCollection<T> {
    fn default() -> Self {
        Self {
            inner: Observable::new(Vec::new()),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ObservableCollection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableCollection")
            .field("items", &self.inner)
            .finish()
    }
}

impl<T> ObservableCollection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&self, items: Vec<T>) {
        self.inner.set(items);
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<T>> {
        self.inner.subscribe()
    }

    pub fn len(&self) -> usize {
        self.inner.with(Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn with<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        self.inner.with(|items| f(items))
    }

    /// The underlying cell, for holders that expose the list as `data`.
    pub fn as_observable(&self) -> &Observable<Vec<T>> {
        &self.inner
    }
}

impl<T: Clone> ObservableCollection<T> {
    pub fn snapshot(&self) -> Vec<T> {
        self.inner.get()
    }
}
