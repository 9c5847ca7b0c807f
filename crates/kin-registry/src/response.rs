//! Response envelope written by the `kin` CLI.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use kin_core::{ErrorDescriptor, KinError, Result};

/// One CLI response: a status code plus either a payload or an error body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Response {
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDescriptor>,
}

impl Response {
    pub fn ok<T: Serialize>(status: u16, payload: &T) -> Result<Self> {
        Ok(Self {
            status,
            data: Some(serde_json::to_value(payload)?),
            error: None,
        })
    }

    pub fn from_error(error: &KinError) -> Self {
        let descriptor = error.descriptor();
        Self {
            status: descriptor.kind.status_code(),
            data: None,
            error: Some(descriptor),
        }
    }

    /// Shape a service result. `success_status` is 201 for registrations,
    /// 200 otherwise.
    pub fn from_result<T: Serialize>(result: Result<T>, success_status: u16) -> Self {
        match result.and_then(|payload| Self::ok(success_status, &payload)) {
            Ok(response) => response,
            Err(e) => Self::from_error(&e),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kin_core::{EmptyRelation, ErrorKind, Lookup, PersonId, Violation};

    #[test]
    fn test_success_envelope() {
        let response = Response::from_result(Ok(vec!["a", "b"]), 200);
        assert!(response.is_success());
        assert_eq!(response.status, 200);
        assert_eq!(response.data, Some(serde_json::json!(["a", "b"])));

        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_empty_relation_is_success() {
        let lookup: Lookup<Vec<String>> = Lookup::Empty(EmptyRelation::NoCousins);
        let response = Response::from_result(Ok(lookup), 200);
        assert_eq!(response.status, 200);
        assert_eq!(
            response.data,
            Some(serde_json::json!({"result": "empty", "data": "no_cousins"}))
        );
    }

    #[test]
    fn test_error_statuses() {
        let missing: Result<()> = Err(KinError::not_found(PersonId::new()));
        let response = Response::from_result(missing, 200);
        assert_eq!(response.status, 404);
        assert!(!response.is_success());
        assert_eq!(response.error.unwrap().kind, ErrorKind::NotFound);

        let invalid: Result<()> = Err(KinError::Validation(vec![Violation::new(
            "email",
            "Email already exists",
        )]));
        let response = Response::from_result(invalid, 201);
        assert_eq!(response.status, 400);
        assert_eq!(response.error.unwrap().violations.len(), 1);

        let broken: Result<()> = Err(KinError::Internal("disk full".to_string()));
        assert_eq!(Response::from_result(broken, 200).status, 500);
    }
}
