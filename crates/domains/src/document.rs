//! # Documents and queries
//!
//! Schemaless records as they travel across the `DocumentStore` port, plus
//! the equality-predicate query language the store supports.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DomainError, Result};

/// Opaque store-assigned identifier.
pub type DocumentId = String;

/// Collection names used by the application.
pub mod collections {
    pub const COUNTRIES: &str = "countries";
    pub const REVIEWS: &str = "reviews";
    pub const TRIPS: &str = "trips";
    pub const USERS: &str = "users";

    /// Per-user sub-collection holding one document per liked country.
    pub fn likes(user_id: &str) -> String {
        format!("likes/{user_id}/countries")
    }
}

/// A model that round-trips through the document store.
///
/// The id is kept out of the serialized body (`#[serde(skip)]` on the field)
/// and attached after decoding.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    fn id(&self) -> &str;
    fn set_id(&mut self, id: DocumentId);
}

/// A raw record: identifier plus JSON object body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: DocumentId,
    pub fields: Value,
}

impl StoredDocument {
    pub fn new(id: impl Into<DocumentId>, fields: Value) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Decodes the body into `T` and attaches the store-assigned id.
    pub fn decode<T: Document>(self) -> Result<T> {
        let mut doc: T = serde_json::from_value(self.fields)?;
        doc.set_id(self.id);
        Ok(doc)
    }
}

/// Serializes a model into a JSON object body.
pub fn encode<T: Document>(doc: &T) -> Result<Value> {
    match serde_json::to_value(doc)? {
        value @ Value::Object(_) => Ok(value),
        other => Err(DomainError::InvalidDocument(format!(
            "documents must serialize to objects, got {other}"
        ))),
    }
}

/// Partial-field update: only the listed fields are replaced.
pub type FieldMap = Map<String, Value>;

/// Equality-predicate query. An empty query selects the whole collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    filters: Vec<(String, Value)>,
}

impl Query {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((field.into(), value.into()));
        self.filters.sort_by(|a, b| a.0.cmp(&b.0));
        self
    }

    pub fn filters(&self) -> &[(String, Value)] {
        &self.filters
    }

    pub fn is_all(&self) -> bool {
        self.filters.is_empty()
    }

    /// True when every predicate matches a top-level field of `fields`.
    pub fn matches(&self, fields: &Value) -> bool {
        self.filters
            .iter()
            .all(|(field, expected)| fields.get(field) == Some(expected))
    }

    /// Stable identity of this query against `collection`, used to key
    /// in-flight fetch tracking. Filters are kept sorted so predicate order
    /// does not change the key.
    pub fn key(&self, collection: &str) -> String {
        if self.filters.is_empty() {
            return collection.to_string();
        }
        let predicates: Vec<String> = self
            .filters
            .iter()
            .map(|(field, value)| format!("{field}={value}"))
            .collect();
        format!("{collection}?{}", predicates.join("&"))
    }
}
