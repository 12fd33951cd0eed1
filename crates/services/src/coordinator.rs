//! In-flight fetch tracking and post-mutation invalidation per query key.
//!
//! Rules:
//! * an ordinary fetch for a key that already has a fetch in flight is
//!   dropped (not queued); the caller may wait for the running fetch and
//!   adopt its result instead of issuing a second call;
//! * a completed mutation invalidates every ticket issued before it and
//!   hands out a forced permit for the refetch, which ignores the in-flight
//!   rule;
//! * a result is applied only if its ticket is still valid and newer than
//!   the last applied ticket, so a slow pre-mutation fetch can never
//!   overwrite the post-mutation view.
//!
//! The last applied result of every key is kept so that every store
//! reading that key can pick it up, not only the one that fetched it.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;

/// Per-key bookkeeping.
#[derive(Debug)]
struct KeyState {
    in_flight: usize,
    next_ticket: u64,
    /// Tickets below this were issued before the latest mutation completed.
    min_valid: u64,
    /// Ticket of the last result applied; 0 means none yet.
    last_applied: u64,
    /// Value published with `last_applied`.
    latest: Option<Arc<dyn Any + Send + Sync>>,
    /// Bumped whenever a permit is released.
    released: watch::Sender<()>,
}

impl Default for KeyState {
    fn default() -> Self {
        Self {
            in_flight: 0,
            next_ticket: 0,
            min_valid: 0,
            last_applied: 0,
            latest: None,
            released: watch::Sender::new(()),
        }
    }
}

impl KeyState {
    fn issue(&mut self) -> u64 {
        self.next_ticket += 1;
        self.in_flight += 1;
        self.next_ticket
    }
}

#[derive(Debug, Default)]
struct Inner {
    keys: Mutex<HashMap<String, KeyState>>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, KeyState>> {
        // The map only holds counters and snapshots; a poisoned lock still
        // has usable data.
        self.keys.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Shared coordinator. `Clone` is cheap; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MutationCoordinator {
    inner: Arc<Inner>,
}

/// Permission to run one fetch for a key.
///
/// Dropping the permit without calling [`FetchPermit::complete`] (failed
/// fetch, aborted task) releases the in-flight slot and applies nothing.
#[derive(Debug)]
pub struct FetchPermit {
    inner: Arc<Inner>,
    key: String,
    ticket: u64,
}

impl FetchPermit {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    /// Publishes `value` for the key and runs `apply` on it, if this
    /// permit's result is still the freshest valid one.
    ///
    /// `apply` runs while the coordinator lock is held, so it must be
    /// synchronous and short (publishing to a watch channel qualifies).
    /// Returns whether the result was applied.
    pub fn complete<V>(self, value: V, apply: impl FnOnce(&V)) -> bool
    where
        V: Any + Send + Sync,
    {
        let mut keys = self.inner.lock();
        let state = keys.entry(self.key.clone()).or_default();
        let fresh = self.ticket >= state.min_valid && self.ticket > state.last_applied;
        if fresh {
            state.last_applied = self.ticket;
            apply(&value);
            state.latest = Some(Arc::new(value));
        } else {
            tracing::debug!(
                key = %self.key,
                ticket = self.ticket,
                min_valid = state.min_valid,
                last_applied = state.last_applied,
                "discarding stale fetch result"
            );
        }
        // The guard is a local and drops before `self`, whose Drop relocks.
        fresh
    }
}

impl Drop for FetchPermit {
    fn drop(&mut self) {
        let mut keys = self.inner.lock();
        if let Some(state) = keys.get_mut(&self.key) {
            state.in_flight = state.in_flight.saturating_sub(1);
            state.released.send_replace(());
        }
    }
}

impl MutationCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests an ordinary fetch. Returns `None` when a fetch for `key`
    /// is already in flight.
    pub fn begin_fetch(&self, key: &str) -> Option<FetchPermit> {
        let ticket = {
            let mut keys = self.inner.lock();
            let state = keys.entry(key.to_string()).or_default();
            if state.in_flight > 0 {
                tracing::debug!(key, "fetch already in flight, dropping request");
                return None;
            }
            state.issue()
        };
        Some(self.permit(key, ticket))
    }

    /// Records a completed mutation on `key` and returns a forced permit
    /// for the refetch that must follow it.
    pub fn invalidate(&self, key: &str) -> FetchPermit {
        let ticket = {
            let mut keys = self.inner.lock();
            let state = keys.entry(key.to_string()).or_default();
            let ticket = state.issue();
            state.min_valid = ticket;
            ticket
        };
        tracing::debug!(key, ticket, "mutation completed, invalidating cached view");
        self.permit(key, ticket)
    }

    pub fn is_in_flight(&self, key: &str) -> bool {
        self.inner
            .lock()
            .get(key)
            .is_some_and(|state| state.in_flight > 0)
    }

    /// Resolves once no fetch for `key` is in flight. Callers must not hold
    /// a permit for `key` themselves.
    pub async fn wait_idle(&self, key: &str) {
        loop {
            let mut released = {
                let mut keys = self.inner.lock();
                let state = keys.entry(key.to_string()).or_default();
                if state.in_flight == 0 {
                    return;
                }
                state.released.subscribe()
            };
            // Entries are never removed, so the sender outlives the wait.
            if released.changed().await.is_err() {
                return;
            }
        }
    }

    /// Runs `apply` on the last applied result for `key`, provided it is
    /// still valid (no mutation completed after it) and of type `V`.
    pub fn adopt_latest<V>(&self, key: &str, apply: impl FnOnce(&V)) -> bool
    where
        V: Any + Send + Sync,
    {
        let keys = self.inner.lock();
        let Some(state) = keys.get(key) else {
            return false;
        };
        if state.last_applied < state.min_valid {
            return false;
        }
        match state.latest.as_ref().and_then(|v| v.downcast_ref::<V>()) {
            Some(value) => {
                apply(value);
                true
            }
            None => false,
        }
    }

    fn permit(&self, key: &str, ticket: u64) -> FetchPermit {
        FetchPermit {
            inner: Arc::clone(&self.inner),
            key: key.to_string(),
            ticket,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_fetch_for_same_key_is_dropped() {
        let coordinator = MutationCoordinator::new();
        let first = coordinator.begin_fetch("reviews");
        assert!(first.is_some());
        assert!(coordinator.begin_fetch("reviews").is_none());
        assert!(coordinator.begin_fetch("trips").is_some());
    }

    #[test]
    fn dropping_permit_frees_the_key() {
        let coordinator = MutationCoordinator::new();
        let permit = coordinator.begin_fetch("reviews").unwrap();
        assert!(coordinator.is_in_flight("reviews"));
        drop(permit);
        assert!(!coordinator.is_in_flight("reviews"));
        assert!(coordinator.begin_fetch("reviews").is_some());
    }

    #[test]
    fn completing_permit_frees_the_key() {
        let coordinator = MutationCoordinator::new();
        let permit = coordinator.begin_fetch("k").unwrap();
        assert!(permit.complete((), |_| {}));
        assert!(!coordinator.is_in_flight("k"));
    }

    #[test]
    fn invalidate_ignores_in_flight_rule() {
        let coordinator = MutationCoordinator::new();
        let _slow = coordinator.begin_fetch("k").unwrap();
        let forced = coordinator.invalidate("k");
        assert_eq!(forced.key(), "k");
    }

    #[test]
    fn pre_mutation_fetch_cannot_overwrite_refetch() {
        let coordinator = MutationCoordinator::new();
        let slow = coordinator.begin_fetch("k").unwrap();
        let forced = coordinator.invalidate("k");

        let mut applied = Vec::new();
        assert!(forced.complete((), |_| applied.push("forced")));
        assert!(!slow.complete((), |_| applied.push("slow")));
        assert_eq!(applied, vec!["forced"]);
    }

    #[test]
    fn stale_fetch_is_discarded_even_if_it_finishes_first() {
        let coordinator = MutationCoordinator::new();
        let slow = coordinator.begin_fetch("k").unwrap();
        let forced = coordinator.invalidate("k");

        assert!(!slow.complete((), |_| panic!("stale result must not be applied")));
        assert!(forced.complete((), |_| {}));
    }

    #[test]
    fn older_refetch_loses_to_newer_one() {
        let coordinator = MutationCoordinator::new();
        let first = coordinator.invalidate("k");
        let second = coordinator.invalidate("k");
        assert!(second.ticket() > first.ticket());
        assert!(second.complete((), |_| {}));
        assert!(!first.complete((), |_| {}));
    }

    #[test]
    fn latest_result_is_shared_until_a_mutation_invalidates_it() {
        let coordinator = MutationCoordinator::new();
        let permit = coordinator.begin_fetch("k").unwrap();
        assert!(permit.complete(vec![1, 2, 3], |_| {}));

        let mut seen = Vec::new();
        assert!(coordinator.adopt_latest("k", |v: &Vec<i32>| seen = v.clone()));
        assert_eq!(seen, vec![1, 2, 3]);
        assert!(!coordinator.adopt_latest("k", |_: &String| {}));

        let forced = coordinator.invalidate("k");
        assert!(!coordinator.adopt_latest("k", |_: &Vec<i32>| {}));
        assert!(forced.complete(vec![4], |_| {}));
        assert!(coordinator.adopt_latest("k", |v: &Vec<i32>| assert_eq!(v, &vec![4])));
    }

    #[tokio::test]
    async fn wait_idle_resolves_when_the_running_fetch_ends() {
        let coordinator = MutationCoordinator::new();
        coordinator.wait_idle("k").await;

        let permit = coordinator.begin_fetch("k").unwrap();
        let waiter = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.wait_idle("k").await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        drop(permit);
        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .expect("waiter wakes up")
            .unwrap();
    }
}
