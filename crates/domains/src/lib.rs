//! wayfarer/crates/domains/src/lib.rs
//!
//! Entity models, port traits and the shared error type for Wayfarer.

pub mod document;
pub mod error;
pub mod models;
pub mod traits;

// Re-exporting for easier access in other crates
pub use document::*;
pub use error::*;
pub use models::*;
pub use traits::*;
