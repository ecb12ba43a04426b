//! Housing cache/snapshot storage for geodata.
//!
//! This crate owns the only stateful subsystem of the API: the housing
//! price cache. It defines the storage and fetcher traits, the error
//! taxonomy, an in-memory store used by tests and local development,
//! and the `HousingCacheService` that decides staleness and runs the
//! snapshot-then-swap refresh protocol.

pub mod error;
pub mod memory;
pub mod service;
pub mod traits;

pub use error::{FetchError, StoreError, StoreResult};
pub use memory::MemoryHousingStore;
pub use service::{HousingCacheService, ServeError, DEFAULT_CACHE_TTL};
pub use traits::{HousingFetcher, HousingStore};
