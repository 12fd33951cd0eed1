//! # Core Traits (Ports)
//!
//! Every remote collaborator sits behind one of these traits. Adapters
//! implement them; state holders receive them as `Arc<dyn _>`.

use async_trait::async_trait;
use bytes::Bytes;

use crate::document::{DocumentId, FieldMap, Query, StoredDocument};
use crate::error::Result;
use crate::models::{GeoPoint, Weather};

/// Schemaless document database addressed by collection path and id.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns every document in `collection` matching `query`.
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<StoredDocument>>;

    /// Fetches one document; `NotFound` if absent.
    async fn get(&self, collection: &str, id: &str) -> Result<StoredDocument>;

    /// Inserts a new document and returns the id the store assigned.
    async fn add(&self, collection: &str, fields: serde_json::Value) -> Result<DocumentId>;

    /// Creates or fully replaces the document at `id`.
    async fn set(&self, collection: &str, id: &str, fields: serde_json::Value) -> Result<()>;

    /// Merges `fields` into an existing document; `NotFound` if absent.
    async fn update(&self, collection: &str, id: &str, fields: FieldMap) -> Result<()>;

    /// Removes a document; `NotFound` if absent.
    async fn delete(&self, collection: &str, id: &str) -> Result<()>;
}

/// Blob storage for images.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores `data` under `key`.
    async fn put(&self, key: &str, data: Bytes, content_type: &mime::Mime) -> Result<()>;

    /// Returns a URL the stored object can be downloaded from.
    async fn download_url(&self, key: &str) -> Result<String>;
}

/// Email/password identity provider.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Registers an account and signs it in; returns the new user id.
    async fn sign_up(&self, email: &str, password: &str) -> Result<String>;

    /// Signs in an existing account; returns its user id.
    async fn sign_in(&self, email: &str, password: &str) -> Result<String>;

    async fn sign_out(&self) -> Result<()>;

    /// The signed-in user id, if any.
    async fn current_user(&self) -> Option<String>;
}

/// Current-conditions lookup by coordinates.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait WeatherService: Send + Sync {
    async fn current(&self, location: GeoPoint) -> Result<Weather>;
}

/// Object key for an image: `{collection}/{name}.webp`.
pub fn image_key(collection: &str, name: &str) -> String {
    format!("{collection}/{name}.webp")
}
