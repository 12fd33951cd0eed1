//! Liked countries of the signed-in user.
//!
//! A like is the presence of `likes/{uid}/countries/{country_name}`; there
//! is no boolean flag. Unliking deletes the document.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use domains::{collections, DocumentStore, DomainError, Like, Query, Result};

use crate::context::Backend;
use crate::coordinator::MutationCoordinator;
use crate::holder::HolderState;
use crate::holders::session::Session;
use crate::observable::ObservableCollection;
use crate::remote_store::{FetchOutcome, RemoteStore};

#[derive(Clone)]
pub struct LikeHolder {
    documents: Arc<dyn DocumentStore>,
    coordinator: MutationCoordinator,
    session: Session,
    cache: ObservableCollection<Like>,
    state: HolderState<Vec<Like>>,
    /// Store for the user the cache currently belongs to.
    store: Arc<Mutex<Option<(String, RemoteStore<Like>)>>>,
}

impl LikeHolder {
    pub fn new(backend: &Backend, session: Session) -> Self {
        let cache = ObservableCollection::new();
        let state = HolderState::with_data(cache.as_observable().clone());
        Self {
            documents: Arc::clone(&backend.documents),
            coordinator: backend.coordinator.clone(),
            session,
            cache,
            state,
            store: Arc::new(Mutex::new(None)),
        }
    }

    pub fn state(&self) -> &HolderState<Vec<Like>> {
        &self.state
    }

    pub async fn load_likes(&self) -> Option<FetchOutcome> {
        self.state
            .track("load_likes", async {
                let store = self.store_for_current_user()?;
                store.fetch_all(Query::all()).await
            })
            .await
    }

    /// Like state as of the last fetch.
    pub fn is_liked(&self, country_name: &str) -> bool {
        self.cache
            .with(|likes| likes.iter().any(|like| like.country_name() == country_name))
    }

    pub fn liked_countries(&self) -> Vec<String> {
        self.cache.with(|likes| {
            likes
                .iter()
                .map(|like| like.country_name().to_string())
                .collect()
        })
    }

    /// Flips the like for `country_name` and returns the new state.
    ///
    /// The remote document decides the current state, not the cache, so a
    /// stale list cannot make the toggle go the wrong way.
    pub async fn toggle_like(&self, country_name: &str) -> Option<bool> {
        self.state
            .track("toggle_like", async {
                let store = self.store_for_current_user()?;
                match store.get(country_name).await {
                    Ok(_) => {
                        store.delete(country_name).await?;
                        tracing::info!(country = country_name, "country unliked");
                        Ok(false)
                    }
                    Err(DomainError::NotFound { .. }) => {
                        let like = Like {
                            id: country_name.to_string(),
                            liked_at: Utc::now(),
                        };
                        store.put(country_name, &like).await?;
                        tracing::info!(country = country_name, "country liked");
                        Ok(true)
                    }
                    Err(error) => Err(error),
                }
            })
            .await
    }

    fn store_for_current_user(&self) -> Result<RemoteStore<Like>> {
        let user_id = self.session.require_user()?;
        let mut slot = self.store.lock().unwrap_or_else(|e| e.into_inner());
        if let Some((owner, store)) = slot.as_ref() {
            if *owner == user_id {
                return Ok(store.clone());
            }
        }

        // Different (or first) user: start from an empty list.
        self.cache.replace(Vec::new());
        let store = RemoteStore::with_coordinator(
            Arc::clone(&self.documents),
            collections::likes(&user_id),
            self.coordinator.clone(),
        )
        .with_cache(self.cache.clone());
        *slot = Some((user_id, store.clone()));
        Ok(store)
    }
}
