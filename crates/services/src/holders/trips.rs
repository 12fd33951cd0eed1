//! Trips planned by the signed-in user.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use domains::{collections, DomainError, FieldMap, Query, Trip};
use serde_json::json;

use crate::context::Backend;
use crate::holder::HolderState;
use crate::holders::session::Session;
use crate::pipeline::upcoming_trips;
use crate::remote_store::{FetchOutcome, RemoteStore};

#[derive(Clone)]
pub struct TripHolder {
    store: RemoteStore<Trip>,
    session: Session,
    state: HolderState<Vec<Trip>>,
}

impl TripHolder {
    pub fn new(backend: &Backend, session: Session) -> Self {
        let store = RemoteStore::with_coordinator(
            Arc::clone(&backend.documents),
            collections::TRIPS,
            backend.coordinator.clone(),
        );
        let state = HolderState::with_data(store.cache().as_observable().clone());
        Self {
            store,
            session,
            state,
        }
    }

    pub fn state(&self) -> &HolderState<Vec<Trip>> {
        &self.state
    }

    pub async fn load_trips(&self) -> Option<FetchOutcome> {
        self.state
            .track("load_trips", async {
                let user_id = self.session.require_user()?;
                self.store
                    .fetch_all(Query::all().where_eq("user_id", user_id))
                    .await
            })
            .await
    }

    pub async fn add_trip(&self, destination: &str, start_date: NaiveDate) -> Option<Trip> {
        self.state
            .track("add_trip", async {
                let user_id = self.session.require_user()?;
                let destination = destination.trim();
                if destination.is_empty() {
                    return Err(DomainError::Validation("Choose a destination".into()));
                }
                let trip = Trip {
                    id: String::new(),
                    user_id,
                    destination: destination.to_string(),
                    start_date,
                    created_at: Utc::now(),
                };
                self.store.create(&trip).await
            })
            .await
    }

    pub async fn reschedule_trip(&self, id: &str, start_date: NaiveDate) -> bool {
        self.state
            .track("reschedule_trip", async {
                self.session.require_user()?;
                let mut fields = FieldMap::new();
                fields.insert("start_date".into(), json!(start_date));
                self.store.update(id, fields).await
            })
            .await
            .is_some()
    }

    pub async fn delete_trip(&self, id: &str) -> bool {
        self.state
            .track("delete_trip", async {
                self.session.require_user()?;
                self.store.delete(id).await
            })
            .await
            .is_some()
    }

    /// Loaded trips departing on or after `today`, soonest first.
    pub fn upcoming(&self, today: NaiveDate) -> Vec<Trip> {
        self.store
            .cache()
            .with(|trips| upcoming_trips(today).apply(trips))
    }

    /// The next departure, if any.
    pub fn next_trip(&self, today: NaiveDate) -> Option<Trip> {
        self.upcoming(today).into_iter().next()
    }
}
