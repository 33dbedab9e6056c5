//! Decoding of the gateway's `{ "data": ..., "errors": [...] }` envelope.
//!
//! Decoding never fails: a body that is not a well-formed envelope degrades
//! to "no data, no errors" and the raw text is kept for diagnostics.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{ApiError, HttpError};

#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(default, deserialize_with = "present")]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<String>>,
}

/// Keeps an explicit `null` distinct from a missing field.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// A decoded gateway response.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEnvelope {
    pub status: u16,

    /// `None` when the body had no `data` field or could not be decoded;
    /// `Some(Value::Null)` when the gateway sent `null` or no body at all.
    pub data: Option<Value>,

    pub errors: Vec<String>,

    /// Raw body text.
    pub body: String,
}

impl ResponseEnvelope {
    pub fn parse(status: u16, body: &str) -> Self {
        if body.trim().is_empty() {
            return Self {
                status,
                data: Some(Value::Null),
                errors: Vec::new(),
                body: body.to_string(),
            };
        }

        match serde_json::from_str::<RawEnvelope>(body) {
            Ok(raw) => Self {
                status,
                data: raw.data,
                errors: raw.errors.unwrap_or_default(),
                body: body.to_string(),
            },
            Err(e) => {
                tracing::debug!(status, error = %e, "response body is not an envelope");
                Self {
                    status,
                    data: None,
                    errors: Vec::new(),
                    body: body.to_string(),
                }
            }
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a failure status into an [`ApiError::Http`].
    pub fn into_result(self) -> Result<Self, ApiError> {
        if self.is_success() {
            Ok(self)
        } else {
            if self.data.is_none() && !self.body.is_empty() {
                tracing::warn!(status = self.status, "error response with malformed body");
            }
            Err(self.into_http_error().into())
        }
    }

    pub(crate) fn into_http_error(self) -> HttpError {
        HttpError {
            status: self.status,
            errors: self.errors,
            body: self.body,
        }
    }

    /// The payload, with a missing `data` field read as `null`.
    pub fn data_or_null(&self) -> Value {
        self.data.clone().unwrap_or(Value::Null)
    }

    /// Whether the payload is absent or `null`.
    pub fn is_null(&self) -> bool {
        matches!(self.data, None | Some(Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_body_is_null_data() {
        let envelope = ResponseEnvelope::parse(204, "");
        assert_eq!(envelope.data, Some(Value::Null));
        assert!(envelope.errors.is_empty());
        assert!(envelope.is_null());
    }

    #[test]
    fn decodes_data_and_errors() {
        let body = json!({"data": [{"saladId": "1"}], "errors": ["partial"]}).to_string();
        let envelope = ResponseEnvelope::parse(200, &body);
        assert_eq!(envelope.data, Some(json!([{"saladId": "1"}])));
        assert_eq!(envelope.errors, vec!["partial".to_string()]);
    }

    #[test]
    fn explicit_null_differs_from_missing_data() {
        let null = ResponseEnvelope::parse(200, r#"{"data":null}"#);
        assert_eq!(null.data, Some(Value::Null));

        let missing = ResponseEnvelope::parse(200, "{}");
        assert_eq!(missing.data, None);
        assert_eq!(missing.data_or_null(), Value::Null);
    }

    #[test]
    fn malformed_body_degrades_without_error() {
        let envelope = ResponseEnvelope::parse(409, "{,}");
        assert_eq!(envelope.data, None);
        assert!(envelope.errors.is_empty());
        assert_eq!(envelope.body, "{,}");
    }

    #[test]
    fn wrong_shape_degrades_without_error() {
        let envelope = ResponseEnvelope::parse(200, r#"{"errors": "not a list"}"#);
        assert_eq!(envelope.data, None);
        assert!(envelope.errors.is_empty());

        let envelope = ResponseEnvelope::parse(200, "[1, 2, 3]");
        assert_eq!(envelope.data, None);
    }

    #[test]
    fn failure_status_becomes_http_error() {
        let body = json!({"errors": ["conflict"]}).to_string();
        let err = ResponseEnvelope::parse(409, &body).into_result().unwrap_err();
        match err {
            ApiError::Http(e) => {
                assert_eq!(e.status, 409);
                assert_eq!(e.errors, vec!["conflict".to_string()]);
                assert_eq!(e.body, body);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn success_status_passes_through() {
        let envelope = ResponseEnvelope::parse(200, r#"{"data":{"spicy":true}}"#)
            .into_result()
            .unwrap();
        assert_eq!(envelope.data, Some(json!({"spicy": true})));
    }
}
