//! # DomainError
//!
//! Centralized error handling for Wayfarer.
//! Every port returns this type so state holders can turn any failure into
//! a user-facing message without knowing which adapter produced it.

use thiserror::Error;

/// The primary error type for all remote operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Transport failure (DNS, timeout, 5xx, unreachable backend)
    #[error("network failure: {0}")]
    NetworkFailure(String),

    /// The backend refused the operation for this caller
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Document or object not found
    #[error("{collection} document {id} not found")]
    NotFound { collection: String, id: String },

    /// No signed-in user, or the credentials were rejected
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// Input rejected before reaching the backend (e.g. empty review text)
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource already exists (e.g. account with the same email)
    #[error("conflict: {0}")]
    Conflict(String),

    /// A stored record could not be decoded into its model
    #[error("invalid document: {0}")]
    InvalidDocument(String),
}

impl DomainError {
    pub fn not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Short text suitable for a toast/snackbar.
    pub fn user_message(&self) -> String {
        match self {
            Self::NetworkFailure(_) => "Could not reach the server. Please try again.".into(),
            Self::PermissionDenied(_) => "You are not allowed to do that.".into(),
            Self::NotFound { .. } => "The requested item no longer exists.".into(),
            Self::Unauthenticated(_) => "Please sign in to continue.".into(),
            Self::Validation(msg) => msg.clone(),
            Self::Conflict(msg) => msg.clone(),
            Self::InvalidDocument(_) => "Received unexpected data from the server.".into(),
        }
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidDocument(err.to_string())
    }
}

/// A specialized Result type for Wayfarer logic.
pub type Result<T> = std::result::Result<T, DomainError>;
