//! # Domain Models
//!
//! These structs represent the entities stored in the remote document store.
//! The store-assigned identifier lives on each record but is never written
//! into the document body: it is attached after decoding.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::document::{Document, DocumentId};
use crate::error::DomainError;

/// Fallback language used when a translation is missing.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Text keyed by language code (e.g. "en", "es").
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalizedText(BTreeMap<String, String>);

impl LocalizedText {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy for fixtures and seeding.
    pub fn with(mut self, lang: &str, text: impl Into<String>) -> Self {
        self.0.insert(lang.to_string(), text.into());
        self
    }

    /// Returns the text for `lang`, falling back to English, then to any
    /// available translation, then to an empty string.
    pub fn get(&self, lang: &str) -> &str {
        self.0
            .get(lang)
            .or_else(|| self.0.get(DEFAULT_LANGUAGE))
            .or_else(|| self.0.values().next())
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthInfo {
    pub required_vaccines: Vec<String>,
    pub recommended_vaccines: Vec<String>,
    pub notes: LocalizedText,
}

/// Travel-advisory level for a destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
    Extreme,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityInfo {
    pub risk_level: RiskLevel,
    pub emergency_number: String,
    pub notes: LocalizedText,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportInfo {
    /// e.g. "metro", "bus", "rail"
    pub modes: Vec<String>,
    pub notes: LocalizedText,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisaInfo {
    pub required: bool,
    pub max_stay_days: Option<u32>,
    pub notes: LocalizedText,
}

/// A destination country with its travel information.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Country {
    #[serde(skip)]
    pub id: DocumentId,
    pub name: LocalizedText,
    pub description: LocalizedText,
    pub capital: String,
    /// Used for the weather lookup of the capital.
    pub coordinates: Option<GeoPoint>,
    pub health: HealthInfo,
    pub security: SecurityInfo,
    pub transport: TransportInfo,
    pub visa: VisaInfo,
    pub image_url: Option<String>,
}

impl Country {
    /// The canonical (English) name, used as the foreign key by reviews,
    /// likes and object keys.
    pub fn canonical_name(&self) -> &str {
        self.name.get(DEFAULT_LANGUAGE)
    }
}

/// Star rating bounded to `0..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Result<Self, DomainError> {
        if value > Self::MAX {
            return Err(DomainError::Validation(format!(
                "rating must be between 0 and {}, got {value}",
                Self::MAX
            )));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.0, Self::MAX)
    }
}

/// A user's review of a country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    #[serde(skip)]
    pub id: DocumentId,
    pub user_id: String,
    pub country_name: String,
    pub rating: Rating,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// A planned trip owned by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    #[serde(skip)]
    pub id: DocumentId,
    pub user_id: String,
    pub destination: String,
    pub start_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl Trip {
    /// Whole days from `today` until departure; negative once the trip started.
    pub fn days_until(&self, today: NaiveDate) -> i64 {
        (self.start_date - today).num_days()
    }
}

/// Profile document stored under `users/{uid}`; the id is the auth user id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    #[serde(skip)]
    pub id: DocumentId,
    pub name: String,
    pub surname: String,
    /// Free-text home location.
    pub location: String,
    pub image_url: Option<String>,
}

impl UserProfile {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.name, self.surname).trim().to_string()
    }
}

/// A like is the presence of `likes/{uid}/countries/{country_name}`.
/// The document id is the liked country's canonical name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Like {
    #[serde(skip)]
    pub id: DocumentId,
    pub liked_at: DateTime<Utc>,
}

impl Like {
    pub fn country_name(&self) -> &str {
        &self.id
    }
}

/// Current conditions returned by the weather service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    pub temperature_celsius: f64,
    pub description: String,
}

macro_rules! impl_document {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Document for $ty {
                fn id(&self) -> &str {
                    &self.id
                }

                fn set_id(&mut self, id: DocumentId) {
                    self.id = id;
                }
            }
        )*
    };
}

impl_document!(Country, Review, Trip, UserProfile, Like);
