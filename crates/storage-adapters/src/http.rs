//! # REST document store
//!
//! Production `DocumentStore` speaking a small JSON-over-HTTP contract:
//!
//! | call | request | response |
//! |---|---|---|
//! | query | `GET {base}/{collection}?field=<json>` | `[{"id", "fields"}]` |
//! | get | `GET {base}/{collection}/{id}` | `{"id", "fields"}` |
//! | add | `POST {base}/{collection}` | `{"id"}` |
//! | set | `PUT {base}/{collection}/{id}` | empty |
//! | update | `PATCH {base}/{collection}/{id}` | empty |
//! | delete | `DELETE {base}/{collection}/{id}` | empty |
//!
//! No retries: every failure is mapped to a `DomainError` and returned.

use async_trait::async_trait;
use domains::{DocumentId, DocumentStore, DomainError, FieldMap, Query, Result, StoredDocument};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct HttpDocumentStore {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedResponse {
    id: DocumentId,
}

impl HttpDocumentStore {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| DomainError::Validation(format!("invalid document store URL: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(DomainError::Validation(format!(
                "document store URL {base_url} cannot be used as a base"
            )));
        }
        Ok(Self {
            client: Client::new(),
            base_url,
            api_key,
        })
    }

    /// `{base}/{collection segments...}[/{id}]`, each segment percent-encoded.
    fn url(&self, collection: &str, id: Option<&str>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty();
            segments.extend(collection.split('/').filter(|s| !s.is_empty()));
            if let Some(id) = id {
                segments.push(id);
            }
        }
        url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, collection: &str, id: &str) -> Result<Response> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| DomainError::NetworkFailure(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(collection, id, %status, "document store request failed");
        Err(map_status(status, collection, id, body))
    }
}

/// Maps a non-success status to the domain taxonomy.
pub(crate) fn map_status(status: StatusCode, collection: &str, id: &str, body: String) -> DomainError {
    match status {
        StatusCode::UNAUTHORIZED => DomainError::Unauthenticated(body),
        StatusCode::FORBIDDEN => DomainError::PermissionDenied(body),
        StatusCode::NOT_FOUND => DomainError::not_found(collection, id),
        StatusCode::CONFLICT => DomainError::Conflict(body),
        other => DomainError::NetworkFailure(format!("unexpected status {other}: {body}")),
    }
}

fn decode_body<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(DomainError::from)
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<StoredDocument>> {
        let params: Vec<(String, String)> = query
            .filters()
            .iter()
            .map(|(field, value)| (field.clone(), value.to_string()))
            .collect();
        let request = self.client.get(self.url(collection, None)).query(&params);
        let response = self.send(request, collection, "").await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| DomainError::NetworkFailure(e.to_string()))?;
        decode_body(&bytes)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<StoredDocument> {
        let request = self.client.get(self.url(collection, Some(id)));
        let response = self.send(request, collection, id).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| DomainError::NetworkFailure(e.to_string()))?;
        decode_body(&bytes)
    }

    async fn add(&self, collection: &str, fields: Value) -> Result<DocumentId> {
        let request = self.client.post(self.url(collection, None)).json(&fields);
        let response = self.send(request, collection, "").await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| DomainError::NetworkFailure(e.to_string()))?;
        let created: CreatedResponse = decode_body(&bytes)?;
        Ok(created.id)
    }

    async fn set(&self, collection: &str, id: &str, fields: Value) -> Result<()> {
        let request = self.client.put(self.url(collection, Some(id))).json(&fields);
        self.send(request, collection, id).await?;
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, fields: FieldMap) -> Result<()> {
        let request = self.client.patch(self.url(collection, Some(id))).json(&fields);
        self.send(request, collection, id).await?;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let request = self.client.delete(self.url(collection, Some(id)));
        self.send(request, collection, id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_encodes_nested_collection_and_id() {
        let store = HttpDocumentStore::new("https://db.test/v1/", None).unwrap();
        let url = store.url("likes/u1/countries", Some("New Zealand"));
        assert_eq!(url.as_str(), "https://db.test/v1/likes/u1/countries/New%20Zealand");
    }

    #[test]
    fn status_codes_map_to_domain_errors() {
        assert!(matches!(
            map_status(StatusCode::UNAUTHORIZED, "c", "i", String::new()),
            DomainError::Unauthenticated(_)
        ));
        assert!(matches!(
            map_status(StatusCode::FORBIDDEN, "c", "i", String::new()),
            DomainError::PermissionDenied(_)
        ));
        assert_eq!(
            map_status(StatusCode::NOT_FOUND, "reviews", "r1", String::new()),
            DomainError::not_found("reviews", "r1")
        );
        assert!(matches!(
            map_status(StatusCode::BAD_GATEWAY, "c", "i", "down".into()),
            DomainError::NetworkFailure(msg) if msg.contains("502")
        ));
    }

    #[test]
    fn rejected_requests_are_network_failures() {
        for status in [StatusCode::BAD_REQUEST, StatusCode::UNPROCESSABLE_ENTITY] {
            assert!(matches!(
                map_status(status, "c", "i", "bad field".into()),
                DomainError::NetworkFailure(msg) if msg.contains(status.as_str())
            ));
        }
    }

    #[test]
    fn list_response_decodes_into_documents() {
        let body = br#"[{"id":"r1","fields":{"rating":4}},{"id":"r2","fields":{"rating":2}}]"#;
        let docs: Vec<StoredDocument> = decode_body(body).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1].fields["rating"], 2);
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(HttpDocumentStore::new("not a url", None).is_err());
        assert!(HttpDocumentStore::new("mailto:ops@example.com", None).is_err());
    }
}
