//! # storage-adapters
//!
//! Implementations of the `domains` ports.
//!
//! Always compiled: the in-memory document store and the object stores.
//! The REST document store and the OpenWeather client sit behind the
//! `backend-http` feature so the offline build carries no HTTP stack.

pub mod memory;
pub mod objects;

#[cfg(feature = "backend-http")]
pub mod http;
#[cfg(feature = "backend-http")]
pub mod weather;

pub use memory::InMemoryDocumentStore;
pub use objects::{LocalObjectStore, MemoryObjectStore};

#[cfg(feature = "backend-http")]
pub use http::HttpDocumentStore;
#[cfg(feature = "backend-http")]
pub use weather::OpenWeatherClient;
