//! Reviews for a country or by the signed-in user.

use std::sync::Arc;

use chrono::Utc;
use domains::{collections, DomainError, FieldMap, Query, Rating, Result, Review};
use serde_json::json;

use crate::context::Backend;
use crate::holder::HolderState;
use crate::holders::session::Session;
use crate::pipeline::{review_pipeline, ReviewFilter};
use crate::remote_store::{FetchOutcome, RemoteStore};

#[derive(Clone)]
pub struct ReviewHolder {
    store: RemoteStore<Review>,
    session: Session,
    state: HolderState<Vec<Review>>,
}

impl ReviewHolder {
    pub fn new(backend: &Backend, session: Session) -> Self {
        let store = RemoteStore::with_coordinator(
            Arc::clone(&backend.documents),
            collections::REVIEWS,
            backend.coordinator.clone(),
        );
        let state = HolderState::with_data(store.cache().as_observable().clone());
        Self {
            store,
            session,
            state,
        }
    }

    pub fn state(&self) -> &HolderState<Vec<Review>> {
        &self.state
    }

    pub async fn load_for_country(&self, country_name: &str) -> Option<FetchOutcome> {
        let query = Query::all().where_eq("country_name", country_name);
        self.state
            .track("load_reviews", self.store.fetch_all(query))
            .await
    }

    /// Reviews written by the signed-in user.
    pub async fn load_for_user(&self) -> Option<FetchOutcome> {
        self.state
            .track("load_user_reviews", async {
                let user_id = self.session.require_user()?;
                self.store
                    .fetch_all(Query::all().where_eq("user_id", user_id))
                    .await
            })
            .await
    }

    /// Publishes a new review by the signed-in user.
    ///
    /// The store does not enforce one review per (user, country); callers
    /// that want that rule check [`ReviewHolder::has_reviewed`] first.
    pub async fn submit_review(&self, country_name: &str, rating: u8, comment: &str) -> Option<Review> {
        self.state
            .track("submit_review", async {
                let user_id = self.session.require_user()?;
                let review = Review {
                    id: String::new(),
                    user_id,
                    country_name: country_name.to_string(),
                    rating: Rating::new(rating)?,
                    comment: validate_comment(comment)?,
                    created_at: Utc::now(),
                };
                self.store.create(&review).await
            })
            .await
    }

    /// Changes rating and comment; author and timestamp stay as they are.
    pub async fn edit_review(&self, id: &str, rating: u8, comment: &str) -> bool {
        self.state
            .track("edit_review", async {
                self.session.require_user()?;
                let mut fields = FieldMap::new();
                fields.insert("rating".into(), json!(Rating::new(rating)?.value()));
                fields.insert("comment".into(), json!(validate_comment(comment)?));
                self.store.update(id, fields).await
            })
            .await
            .is_some()
    }

    pub async fn delete_review(&self, id: &str) -> bool {
        self.state
            .track("delete_review", async {
                self.session.require_user()?;
                self.store.delete(id).await
            })
            .await
            .is_some()
    }

    /// Display-ready list: rating filter first, then date ordering.
    pub fn displayed(&self, filter: ReviewFilter) -> Vec<Review> {
        self.store
            .cache()
            .with(|reviews| review_pipeline(filter).apply(reviews))
    }

    /// Mean rating of the loaded reviews, `None` when there are none.
    pub fn average_rating(&self) -> Option<f64> {
        self.store.cache().with(|reviews| {
            if reviews.is_empty() {
                return None;
            }
            let total: u32 = reviews.iter().map(|r| u32::from(r.rating.value())).sum();
            Some(f64::from(total) / reviews.len() as f64)
        })
    }

    pub fn has_reviewed(&self, user_id: &str, country_name: &str) -> bool {
        self.store.cache().with(|reviews| {
            reviews
                .iter()
                .any(|r| r.user_id == user_id && r.country_name == country_name)
        })
    }
}

fn validate_comment(comment: &str) -> Result<String> {
    let comment = comment.trim();
    if comment.is_empty() {
        return Err(DomainError::Validation("Review text cannot be empty".into()));
    }
    Ok(comment.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{MockAuthService, MockDocumentStore, MockObjectStore, MockWeatherService, StoredDocument};

    fn backend(documents: MockDocumentStore) -> Backend {
        Backend::new(
            Arc::new(documents),
            Arc::new(MockObjectStore::new()),
            Arc::new(MockAuthService::new()),
            Arc::new(MockWeatherService::new()),
        )
    }

    fn signed_in(user: Option<&str>) -> Session {
        let mut auth = MockAuthService::new();
        let user = user.map(str::to_string);
        auth.expect_current_user().returning(move || user.clone());
        Session::new(Arc::new(auth))
    }

    fn stored(id: &str, user: &str, rating: u8, created_at: &str) -> StoredDocument {
        StoredDocument::new(
            id,
            json!({
                "user_id": user,
                "country_name": "Peru",
                "rating": rating,
                "comment": "text",
                "created_at": created_at
            }),
        )
    }

    #[tokio::test]
    async fn submit_without_session_is_unauthenticated() {
        let mut documents = MockDocumentStore::new();
        documents.expect_add().never();
        let holder = ReviewHolder::new(&backend(documents), signed_in(None));

        assert!(holder.submit_review("Peru", 4, "great").await.is_none());
        assert_eq!(
            holder.state().error_message.get().as_deref(),
            Some("Please sign in to continue.")
        );
    }

    #[tokio::test]
    async fn empty_comment_is_rejected_before_any_call() {
        let mut documents = MockDocumentStore::new();
        documents.expect_add().never();
        let session = signed_in(Some("u1"));
        session.restore().await;
        let holder = ReviewHolder::new(&backend(documents), session);

        assert!(holder.submit_review("Peru", 4, "   ").await.is_none());
        assert_eq!(
            holder.state().error_message.get().as_deref(),
            Some("Review text cannot be empty")
        );
        assert!(holder.submit_review("Peru", 6, "fine").await.is_none());
    }

    #[tokio::test]
    async fn displayed_filters_then_orders_loaded_reviews() {
        let mut documents = MockDocumentStore::new();
        documents.expect_query().returning(|_, _| {
            Ok(vec![
                stored("a", "u1", 5, "2024-01-01T00:00:00Z"),
                stored("b", "u2", 2, "2024-01-03T00:00:00Z"),
                stored("c", "u3", 4, "2024-01-02T00:00:00Z"),
            ])
        });
        let holder = ReviewHolder::new(&backend(documents), signed_in(None));
        holder.load_for_country("Peru").await;

        let newest_first = holder.displayed(ReviewFilter {
            min_rating: Some(4),
            newest_first: true,
        });
        let ids: Vec<&str> = newest_first.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a"]);

        let avg = holder.average_rating().unwrap();
        assert!((avg - 11.0 / 3.0).abs() < f64::EPSILON);
        assert!(holder.has_reviewed("u2", "Peru"));
        assert!(!holder.has_reviewed("u2", "Chile"));
    }

    #[tokio::test]
    async fn edit_sends_rating_and_comment_only() {
        let mut documents = MockDocumentStore::new();
        documents
            .expect_update()
            .withf(|_, id, fields| {
                id == "r1" && fields.len() == 2 && fields["rating"] == 3 && fields["comment"] == "meh"
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        documents.expect_query().returning(|_, _| Ok(vec![]));
        let session = signed_in(Some("u1"));
        session.restore().await;
        let holder = ReviewHolder::new(&backend(documents), session);

        assert!(holder.edit_review("r1", 3, " meh ").await);
    }

    #[test]
    fn average_of_nothing_is_none() {
        let holder = ReviewHolder::new(&backend(MockDocumentStore::new()), signed_in(None));
        assert_eq!(holder.average_rating(), None);
    }
}
