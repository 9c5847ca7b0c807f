//! kin-registry: Person store and relationship query engine for the Kin family registry.
//!
//! A `PersonStore` (in-memory or Neo4j) holds people and their stored
//! sibling/parent relations. The `derive` module computes siblings, parents,
//! nested children, grandparents, and cousins from a store, and
//! `RegistryService` exposes every query and mutation with uniform
//! empty-result and error handling.

pub mod derive;
pub mod memory;
pub mod neo4j;
pub mod response;
pub mod service;
pub mod store;
pub mod validation;

pub use derive::DeriveLimits;
pub use memory::MemoryStore;
pub use neo4j::Neo4jStore;
pub use service::RegistryService;
pub use store::PersonStore;
