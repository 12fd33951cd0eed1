//! Shared fixtures for the cross-crate scenario tests: a fully in-memory
//! backend and a few sample countries.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use auth_adapters::LocalAuthService;
use domains::{
    collections, encode, Country, DocumentStore, GeoPoint, LocalizedText, Result, RiskLevel,
    SecurityInfo, Weather, WeatherService,
};
use services::holders::Registration;
use services::{Backend, Holders};
use storage_adapters::{InMemoryDocumentStore, MemoryObjectStore};

/// Always-sunny weather service.
pub struct FixedWeather;

#[async_trait]
impl WeatherService for FixedWeather {
    async fn current(&self, _location: GeoPoint) -> Result<Weather> {
        Ok(Weather {
            temperature_celsius: 24.0,
            description: "clear sky".into(),
        })
    }
}

/// Backend plus typed handles on the fakes behind it, for assertions.
pub struct TestBackend {
    pub backend: Backend,
    pub documents: Arc<InMemoryDocumentStore>,
    pub objects: Arc<MemoryObjectStore>,
    pub auth: Arc<LocalAuthService>,
}

impl TestBackend {
    pub fn new() -> Self {
        Self::with_documents(InMemoryDocumentStore::new())
    }

    /// Every document call sleeps for `latency`, so tests can overlap calls.
    pub fn with_latency(latency: Duration) -> Self {
        Self::with_documents(InMemoryDocumentStore::new().with_latency(latency))
    }

    fn with_documents(documents: InMemoryDocumentStore) -> Self {
        let documents = Arc::new(documents);
        let objects = Arc::new(MemoryObjectStore::default());
        let auth = Arc::new(LocalAuthService::new());
        let backend = Backend::new(
            documents.clone(),
            objects.clone(),
            auth.clone(),
            Arc::new(FixedWeather),
        );
        Self {
            backend,
            documents,
            objects,
            auth,
        }
    }

    pub fn holders(&self) -> Holders {
        Holders::new(&self.backend)
    }

    /// Writes the sample countries straight into the document store.
    pub async fn seed_countries(&self) {
        for country in sample_countries() {
            self.documents
                .add(collections::COUNTRIES, encode(&country).expect("encodable country"))
                .await
                .expect("seeding countries");
        }
    }
}

impl Default for TestBackend {
    fn default() -> Self {
        Self::new()
    }
}

pub fn country(en: &str, es: &str, capital: &str, coordinates: Option<GeoPoint>) -> Country {
    Country {
        name: LocalizedText::new().with("en", en).with("es", es),
        capital: capital.to_string(),
        coordinates,
        ..Default::default()
    }
}

pub fn sample_countries() -> Vec<Country> {
    let mut japan = country("Japan", "Japón", "Tokyo", Some(GeoPoint::new(35.68, 139.69)));
    japan.security = SecurityInfo {
        risk_level: RiskLevel::Low,
        emergency_number: "110".into(),
        ..Default::default()
    };
    vec![
        country("Australia", "Australia", "Canberra", Some(GeoPoint::new(-35.28, 149.13))),
        japan,
        country("Peru", "Perú", "Lima", Some(GeoPoint::new(-12.05, -77.04))),
    ]
}

pub fn registration(email: &str) -> Registration {
    Registration {
        email: email.to_string(),
        password: "secret123".into(),
        name: "Ana".into(),
        surname: "Lopez".into(),
    }
}

/// Signs up a fresh account through the session holder and returns its id.
pub async fn signed_in(holders: &Holders, email: &str) -> String {
    holders
        .session
        .sign_up(registration(email))
        .await
        .expect("sign-up succeeds")
}
