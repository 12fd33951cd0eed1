//! wayfarer/crates/services/src/lib.rs
//!
//! Remote-backed reactive store and the state holders built on it.
//!
//! Flow: a UI event launches a task on a holder → the holder mutates the
//! remote store → the [`MutationCoordinator`] forces a refetch → the fetch
//! result replaces an [`ObservableCollection`] → subscribers re-render and
//! derive display lists through a [`FilterSortPipeline`].

pub mod context;
pub mod coordinator;
pub mod holder;
pub mod holders;
pub mod observable;
pub mod pipeline;
pub mod remote_store;
pub mod seed;
pub mod tasks;

pub use context::Backend;
pub use coordinator::{FetchPermit, MutationCoordinator};
pub use holder::{HolderState, Scoped};
pub use holders::Holders;
pub use observable::{Observable, ObservableCollection};
pub use pipeline::{FilterSortPipeline, ReviewFilter};
pub use remote_store::{FetchOutcome, RemoteStore};
pub use seed::{parse_countries, seed_countries, SeedReport};
pub use tasks::TaskScope;
