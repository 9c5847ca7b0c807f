//! Kin Graph: Neo4j client for the family registry.
//!
//! People are `:Person` nodes keyed by `id`. Stored relations are
//! `(:Person)-[:SIBLING_OF]->(:Person)`, written in both directions, and
//! `(parent:Person)-[:PARENT_OF]->(child:Person)`. Every relation carries a
//! `recorded_at` stamp (microseconds) that defines its natural order.

pub mod client;
pub mod mutations;
pub mod queries;

pub use client::{GraphClient, GraphConfig, GraphError};
