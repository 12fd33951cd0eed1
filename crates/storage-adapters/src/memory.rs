//! # In-memory document store
//!
//! Fake `DocumentStore` for tests and the offline demo backend. Collections
//! live in a `DashMap`; ids are random UUIDs, like a real store would hand
//! out. Optional latency and an "offline" switch let tests exercise slow
//! and failing networks.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use domains::{DocumentId, DocumentStore, DomainError, FieldMap, Query, Result, StoredDocument};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    /// collection path -> (id -> body); BTreeMap keeps query output ordered.
    collections: DashMap<String, BTreeMap<DocumentId, Value>>,
    latency: Duration,
    offline: AtomicBool,
    query_calls: AtomicUsize,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call sleeps for `latency` before touching data.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// While offline every call fails with `NetworkFailure`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of `query` round trips served so far.
    pub fn query_calls(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }

    /// Number of documents currently in `collection`.
    pub fn count(&self, collection: &str) -> usize {
        self.collections.get(collection).map_or(0, |docs| docs.len())
    }

    async fn round_trip(&self) -> Result<()> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(DomainError::NetworkFailure("in-memory store is offline".into()));
        }
        Ok(())
    }
}

fn ensure_object(fields: &Value) -> Result<()> {
    if fields.is_object() {
        Ok(())
    } else {
        Err(DomainError::InvalidDocument("document body must be a JSON object".into()))
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<StoredDocument>> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        self.round_trip().await?;

        let Some(docs) = self.collections.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(docs
            .iter()
            .filter(|(_, fields)| query.matches(fields))
            .map(|(id, fields)| StoredDocument::new(id.clone(), fields.clone()))
            .collect())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<StoredDocument> {
        self.round_trip().await?;
        self.collections
            .get(collection)
            .and_then(|docs| docs.get(id).cloned())
            .map(|fields| StoredDocument::new(id, fields))
            .ok_or_else(|| DomainError::not_found(collection, id))
    }

    async fn add(&self, collection: &str, fields: Value) -> Result<DocumentId> {
        ensure_object(&fields)?;
        self.round_trip().await?;
        let id = Uuid::new_v4().simple().to_string();
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), fields);
        tracing::debug!(collection, %id, "memory: add");
        Ok(id)
    }

    async fn set(&self, collection: &str, id: &str, fields: Value) -> Result<()> {
        ensure_object(&fields)?;
        self.round_trip().await?;
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
        tracing::debug!(collection, id, "memory: set");
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, fields: FieldMap) -> Result<()> {
        self.round_trip().await?;
        let mut docs = self
            .collections
            .get_mut(collection)
            .ok_or_else(|| DomainError::not_found(collection, id))?;
        let existing = docs
            .get_mut(id)
            .and_then(Value::as_object_mut)
            .ok_or_else(|| DomainError::not_found(collection, id))?;
        for (field, value) in fields {
            existing.insert(field, value);
        }
        tracing::debug!(collection, id, "memory: update");
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        self.round_trip().await?;
        let removed = self
            .collections
            .get_mut(collection)
            .and_then(|mut docs| docs.remove(id));
        match removed {
            Some(_) => {
                tracing::debug!(collection, id, "memory: delete");
                Ok(())
            }
            None => Err(DomainError::not_found(collection, id)),
        }
    }
}
