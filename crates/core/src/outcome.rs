//! Caller-facing result envelope.
//!
//! Core operations return `Result<T, LedgerError>`. Callers that speak JSON
//! wrap it in an [`Outcome`], which serializes as
//! `{"ok": true, "data": ...}` or `{"ok": false, "error": {...}}`.

use serde::Serialize;

use crate::error::{ErrorKind, LedgerError};

/// Serialized failure details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    /// Classification the HTTP layer maps to a status code.
    pub kind: ErrorKind,
    /// Stable error code.
    pub code: &'static str,
    /// Human-readable message.
    pub message: String,
}

impl From<&LedgerError> for ErrorBody {
    fn from(err: &LedgerError) -> Self {
        Self {
            kind: err.kind(),
            code: err.error_code(),
            message: err.to_string(),
        }
    }
}

/// Discriminated success/failure result of one core operation.
#[derive(Debug, Clone, Serialize)]
pub struct Outcome<T> {
    /// Whether the operation committed.
    pub ok: bool,
    /// Payload on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Failure details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl<T> Outcome<T> {
    /// Returns the HTTP status code for this outcome.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.error
            .as_ref()
            .map_or(200, |body| body.kind.http_status_code())
    }
}

impl<T> From<Result<T, LedgerError>> for Outcome<T> {
    fn from(result: Result<T, LedgerError>) -> Self {
        match result {
            Ok(data) => Self {
                ok: true,
                data: Some(data),
                error: None,
            },
            Err(err) => Self {
                ok: false,
                data: None,
                error: Some(ErrorBody::from(&err)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_success_envelope() {
        let outcome: Outcome<u32> = Ok(7).into();
        assert!(outcome.ok);
        assert_eq!(outcome.status_code(), 200);
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            serde_json::json!({ "ok": true, "data": 7 })
        );
    }

    #[test]
    fn test_failure_envelope() {
        let outcome: Outcome<u32> = Err(LedgerError::AmountMismatch {
            amount: dec!(500),
            allocated: dec!(450),
        })
        .into();
        assert!(!outcome.ok);
        assert_eq!(outcome.status_code(), 400);

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["ok"], false);
        assert!(json.get("data").is_none());
        assert_eq!(json["error"]["kind"], "AMOUNT_MISMATCH");
        assert_eq!(json["error"]["code"], "AMOUNT_MISMATCH");
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let outcome: Outcome<()> =
            Err(LedgerError::PartyNotFound(billfold_shared::types::PartyId::new())).into();
        assert_eq!(outcome.status_code(), 404);
        assert_eq!(outcome.error.unwrap().kind, ErrorKind::NotFound);
    }
}
