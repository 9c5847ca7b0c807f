//! kin-core: Shared types, configuration, and error handling for the Kin family registry.
//!
//! This crate provides the foundational types used across all Kin components:
//! - Person records and the summaries/trees returned by relationship queries
//! - The `Lookup` result with its explicit empty-relation marker
//! - Configuration loading
//! - The closed error taxonomy (`KinError`)

pub mod config;
pub mod error;
pub mod types;

pub use error::{ErrorDescriptor, ErrorKind, KinError, Result, Violation};
pub use types::{
    ChildTree, Deleted, EmptyRelation, Grandparents, Lookup, NewPerson, Person, PersonDetail,
    PersonId, PersonSummary, PersonUpdate,
};
