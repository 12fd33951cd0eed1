//! Explicit dependency injection: remote clients are built once at process
//! start and handed to every state holder by reference.

use std::sync::Arc;

use domains::{AuthService, DocumentStore, ObjectStore, WeatherService};

use crate::coordinator::MutationCoordinator;

/// The remote collaborators of the application.
#[derive(Clone)]
pub struct Backend {
    pub documents: Arc<dyn DocumentStore>,
    pub objects: Arc<dyn ObjectStore>,
    pub auth: Arc<dyn AuthService>,
    pub weather: Arc<dyn WeatherService>,
    /// Shared so holders reading the same query never double-fetch it.
    pub coordinator: MutationCoordinator,
}

impl Backend {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        objects: Arc<dyn ObjectStore>,
        auth: Arc<dyn AuthService>,
        weather: Arc<dyn WeatherService>,
    ) -> Self {
        Self {
            documents,
            objects,
            auth,
            weather,
            coordinator: MutationCoordinator::new(),
        }
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend").finish_non_exhaustive()
    }
}
