use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::PersonId;

/// Top-level error type for the Kin registry.
///
/// The set of kinds is closed so the transport layer can map every failure
/// deterministically; see [`ErrorKind::status_code`].
#[derive(Error, Debug)]
pub enum KinError {
    #[error("Person not found: {id}")]
    NotFound { id: PersonId },

    #[error("Validation failed: {}", join_violations(.0))]
    Validation(Vec<Violation>),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl KinError {
    pub fn not_found(id: PersonId) -> Self {
        Self::NotFound { id }
    }

    /// A validation error with a single violated constraint.
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::Validation(vec![Violation::new(field, message)])
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::Validation(v) => v,
            _ => &[],
        }
    }

    pub fn descriptor(&self) -> ErrorDescriptor {
        ErrorDescriptor {
            kind: self.kind(),
            message: self.to_string(),
            violations: self.violations().to_vec(),
        }
    }
}

impl From<serde_json::Error> for KinError {
    fn from(e: serde_json::Error) -> Self {
        Self::Internal(format!("Serialization error: {e}"))
    }
}

impl From<std::io::Error> for KinError {
    fn from(e: std::io::Error) -> Self {
        Self::Internal(format!("IO error: {e}"))
    }
}

/// One violated constraint on an input field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

impl Violation {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(Violation::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Discriminant of [`KinError`], safe to hand across the transport boundary.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Validation,
    Internal,
}

impl ErrorKind {
    /// HTTP-style status for the transport layer.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::Validation => 400,
            Self::Internal => 500,
        }
    }
}

/// Structured error body: kind, human message, and any violated constraints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorDescriptor {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<Violation>,
}

pub type Result<T> = std::result::Result<T, KinError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_lists_every_violation() {
        let err = KinError::Validation(vec![
            Violation::new("email", "Email already exists"),
            Violation::new("username", "Username already exists"),
        ]);
        assert_eq!(
            err.to_string(),
            "Validation failed: email: Email already exists; username: Username already exists"
        );
        assert_eq!(err.kind().status_code(), 400);
    }

    #[test]
    fn descriptor_carries_kind_and_violations() {
        let id = PersonId::new();
        let d = KinError::not_found(id).descriptor();
        assert_eq!(d.kind, ErrorKind::NotFound);
        assert!(d.message.contains(&id.to_string()));
        assert!(d.violations.is_empty());

        let json = serde_json::to_value(KinError::invalid("password", "Passwords do not match").descriptor()).unwrap();
        assert_eq!(json["kind"], "validation");
        assert_eq!(json["violations"][0]["field"], "password");
    }

    #[test]
    fn status_codes() {
        assert_eq!(ErrorKind::NotFound.status_code(), 404);
        assert_eq!(ErrorKind::Internal.status_code(), 500);
    }
}
