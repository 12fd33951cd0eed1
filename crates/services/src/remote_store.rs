//! CRUD against one remote collection with an observable cache of the
//! last fetched result set.
//!
//! Reads go through the [`MutationCoordinator`] so overlapping fetches for
//! the same query are collapsed: a store whose request is dropped, or whose
//! result went stale, waits for the fetch that won and adopts its result.
//! Every successful mutation is followed by a
//! forced refetch of the store's active query: that refetch is the only way
//! the cache is invalidated. There is no optimistic update.

use std::sync::{Arc, Mutex};

use domains::{encode, Document, DocumentStore, FieldMap, Query, Result};

use crate::coordinator::{FetchPermit, MutationCoordinator};
use crate::observable::ObservableCollection;

/// What happened to a fetch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The result replaced the cache; carries the item count.
    Applied(usize),
    /// The fetch ran but a mutation made its result stale, so it was dropped.
    Stale,
    /// A fetch for the same query was already in flight; no call was made
    /// and no valid result was available to adopt afterwards.
    Skipped,
    /// Another store's fetch for the same query won; its result replaced
    /// the cache. Carries the item count.
    Shared(usize),
}

pub struct RemoteStore<T> {
    documents: Arc<dyn DocumentStore>,
    collection: String,
    cache: ObservableCollection<T>,
    coordinator: MutationCoordinator,
    /// Query whose results the cache currently represents.
    active_query: Arc<Mutex<Query>>,
}

impl<T> Clone for RemoteStore<T> {
    fn clone(&self) -> Self {
        Self {
            documents: Arc::clone(&self.documents),
            collection: self.collection.clone(),
            cache: self.cache.clone(),
            coordinator: self.coordinator.clone(),
            active_query: Arc::clone(&self.active_query),
        }
    }
}

impl<T: Document> RemoteStore<T> {
    pub fn new(documents: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self::with_coordinator(documents, collection, MutationCoordinator::new())
    }

    /// Shares in-flight tracking with other stores built on the same
    /// coordinator.
    pub fn with_coordinator(
        documents: Arc<dyn DocumentStore>,
        collection: impl Into<String>,
        coordinator: MutationCoordinator,
    ) -> Self {
        Self {
            documents,
            collection: collection.into(),
            cache: ObservableCollection::new(),
            coordinator,
            active_query: Arc::new(Mutex::new(Query::all())),
        }
    }

    /// Publishes into `cache` instead of a fresh collection, so a holder can
    /// swap the underlying store (e.g. on user change) behind one observable.
    pub fn with_cache(mut self, cache: ObservableCollection<T>) -> Self {
        self.cache = cache;
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn cache(&self) -> &ObservableCollection<T> {
        &self.cache
    }

    pub fn items(&self) -> Vec<T> {
        self.cache.snapshot()
    }

    pub fn active_query(&self) -> Query {
        self.active_query
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Fetches every document matching `query` and replaces the cache.
    ///
    /// `query` becomes the active query, so later mutations refetch it.
    pub async fn fetch_all(&self, query: Query) -> Result<FetchOutcome> {
        let key = query.key(&self.collection);
        *self.active_query.lock().unwrap_or_else(|e| e.into_inner()) = query.clone();

        let Some(permit) = self.coordinator.begin_fetch(&key) else {
            return Ok(self.adopt(&key, FetchOutcome::Skipped).await);
        };
        self.run_fetch(permit, &query).await
    }

    /// Reads a single document without touching the cache.
    pub async fn get(&self, id: &str) -> Result<T> {
        self.documents.get(&self.collection, id).await?.decode()
    }

    /// Inserts `doc`; the returned copy carries the store-assigned id.
    pub async fn create(&self, doc: &T) -> Result<T> {
        let fields = encode(doc)?;
        let id = self.documents.add(&self.collection, fields).await?;
        tracing::info!(collection = %self.collection, %id, "document created");

        let mut created = doc.clone();
        created.set_id(id);
        self.refresh_after_mutation().await;
        Ok(created)
    }

    /// Creates or fully replaces the document at `id`.
    pub async fn put(&self, id: &str, doc: &T) -> Result<T> {
        let fields = encode(doc)?;
        self.documents.set(&self.collection, id, fields).await?;
        tracing::info!(collection = %self.collection, id, "document written");

        let mut written = doc.clone();
        written.set_id(id.to_string());
        self.refresh_after_mutation().await;
        Ok(written)
    }

    /// Merges `fields` into the document; fields not listed stay untouched.
    pub async fn update(&self, id: &str, fields: FieldMap) -> Result<()> {
        self.documents.update(&self.collection, id, fields).await?;
        tracing::info!(collection = %self.collection, id, "document updated");
        self.refresh_after_mutation().await;
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.documents.delete(&self.collection, id).await?;
        tracing::info!(collection = %self.collection, id, "document deleted");
        self.refresh_after_mutation().await;
        Ok(())
    }

    /// Forced refetch of the active query after a completed mutation.
    ///
    /// The mutation already succeeded, so a failing refetch is logged and
    /// the cache keeps its previous contents.
    async fn refresh_after_mutation(&self) {
        let query = self.active_query();
        let permit = self.coordinator.invalidate(&query.key(&self.collection));
        if let Err(error) = self.run_fetch(permit, &query).await {
            tracing::warn!(collection = %self.collection, %error, "refetch after mutation failed");
        }
    }

    async fn run_fetch(&self, permit: FetchPermit, query: &Query) -> Result<FetchOutcome> {
        tracing::debug!(key = permit.key(), ticket = permit.ticket(), "fetching");
        let records = self.documents.query(&self.collection, query).await?;

        let mut items = Vec::with_capacity(records.len());
        for record in records {
            let id = record.id.clone();
            match record.decode::<T>() {
                Ok(item) => items.push(item),
                Err(error) => {
                    tracing::warn!(collection = %self.collection, %id, %error, "skipping undecodable document");
                }
            }
        }

        let count = items.len();
        let key = permit.key().to_string();
        let cache = &self.cache;
        if permit.complete(items, |items: &Vec<T>| cache.replace(items.clone())) {
            tracing::debug!(collection = %self.collection, count, "cache replaced");
            Ok(FetchOutcome::Applied(count))
        } else {
            Ok(self.adopt(&key, FetchOutcome::Stale).await)
        }
    }

    /// Waits for the fetch that holds `key` and copies its result into this
    /// store's cache. Returns `fallback` when there is no valid result, e.g.
    /// the winning fetch failed.
    async fn adopt(&self, key: &str, fallback: FetchOutcome) -> FetchOutcome {
        self.coordinator.wait_idle(key).await;
        let mut adopted = None;
        let cache = &self.cache;
        self.coordinator.adopt_latest(key, |items: &Vec<T>| {
            cache.replace(items.clone());
            adopted = Some(items.len());
        });
        match adopted {
            Some(count) => {
                tracing::debug!(collection = %self.collection, count, "adopted shared fetch result");
                FetchOutcome::Shared(count)
            }
            None => fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{DomainError, MockDocumentStore, Rating, Review, StoredDocument};
    use serde_json::json;

    fn review_doc(id: &str, country: &str) -> StoredDocument {
        StoredDocument::new(
            id,
            json!({
                "user_id": "u1",
                "country_name": country,
                "rating": 4,
                "comment": "nice",
                "created_at": "2024-02-01T00:00:00Z"
            }),
        )
    }

    #[tokio::test]
    async fn fetch_replaces_cache_with_query_result() {
        let mut mock = MockDocumentStore::new();
        mock.expect_query()
            .withf(|collection, query| collection == "reviews" && !query.is_all())
            .times(1)
            .returning(|_, _| Ok(vec![review_doc("r1", "Peru"), review_doc("r2", "Peru")]));

        let store: RemoteStore<Review> = RemoteStore::new(Arc::new(mock), "reviews");
        let outcome = store
            .fetch_all(Query::all().where_eq("country_name", "Peru"))
            .await
            .unwrap();

        assert_eq!(outcome, FetchOutcome::Applied(2));
        let ids: Vec<String> = store.items().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["r1", "r2"]);
    }

    #[tokio::test]
    async fn undecodable_records_are_skipped() {
        let mut mock = MockDocumentStore::new();
        mock.expect_query().returning(|_, _| {
            Ok(vec![
                review_doc("good", "Peru"),
                StoredDocument::new("bad", json!({ "rating": "five" })),
            ])
        });

        let store: RemoteStore<Review> = RemoteStore::new(Arc::new(mock), "reviews");
        assert_eq!(store.fetch_all(Query::all()).await.unwrap(), FetchOutcome::Applied(1));
    }

    #[tokio::test]
    async fn failed_fetch_leaves_cache_untouched_and_frees_key() {
        let mut mock = MockDocumentStore::new();
        let mut calls = 0;
        mock.expect_query().times(2).returning(move |_, _| {
            calls += 1;
            if calls == 1 {
                Ok(vec![review_doc("r1", "Peru")])
            } else {
                Err(DomainError::NetworkFailure("offline".into()))
            }
        });

        let store: RemoteStore<Review> = RemoteStore::new(Arc::new(mock), "reviews");
        store.fetch_all(Query::all()).await.unwrap();
        let err = store.fetch_all(Query::all()).await.unwrap_err();

        assert!(matches!(err, DomainError::NetworkFailure(_)));
        assert_eq!(store.items().len(), 1);
    }

    #[tokio::test]
    async fn create_attaches_id_and_refetches_active_query() {
        let mut mock = MockDocumentStore::new();
        mock.expect_add()
            .withf(|collection, fields| collection == "reviews" && fields.get("id").is_none())
            .times(1)
            .returning(|_, _| Ok("new-id".to_string()));
        mock.expect_query()
            .times(1)
            .returning(|_, _| Ok(vec![review_doc("new-id", "Chile")]));

        let store: RemoteStore<Review> = RemoteStore::new(Arc::new(mock), "reviews");
        let review = Review {
            id: String::new(),
            user_id: "u1".into(),
            country_name: "Chile".into(),
            rating: Rating::new(4).unwrap(),
            comment: "nice".into(),
            created_at: chrono::Utc::now(),
        };

        let created = store.create(&review).await.unwrap();
        assert_eq!(created.id, "new-id");
        assert_eq!(store.items().len(), 1);
    }

    #[tokio::test]
    async fn failed_mutation_does_not_refetch() {
        let mut mock = MockDocumentStore::new();
        mock.expect_delete()
            .returning(|collection, id| Err(DomainError::not_found(collection, id)));
        mock.expect_query().never();

        let store: RemoteStore<Review> = RemoteStore::new(Arc::new(mock), "reviews");
        let err = store.delete("missing").await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn update_sends_only_listed_fields() {
        let mut mock = MockDocumentStore::new();
        mock.expect_update()
            .withf(|_, id, fields| id == "r1" && fields.len() == 1 && fields.contains_key("comment"))
            .times(1)
            .returning(|_, _, _| Ok(()));
        mock.expect_query().returning(|_, _| Ok(vec![]));

        let store: RemoteStore<Review> = RemoteStore::new(Arc::new(mock), "reviews");
        let mut fields = FieldMap::new();
        fields.insert("comment".into(), json!("edited"));
        store.update("r1", fields).await.unwrap();
    }
}
