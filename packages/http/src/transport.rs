//! HTTP transport abstraction.
//!
//! The client layers above only ever talk to a [`Transport`], so tests can
//! swap in [`crate::mock::MockTransport`] and avoid real network calls.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use reqwest::multipart::{Form, Part};
use reqwest::Client;

use crate::error::Error;
use crate::types::{HttpRequest, HttpResponse};

/// Trait for executing HTTP requests.
///
/// Implementations perform exactly one exchange per call and report the
/// status, headers and raw body. Non-2xx statuses are not errors at this
/// level.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute an HTTP request and return the response.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, Error>;
}

/// Production transport using reqwest.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a new transport with the given timeout.
    pub fn new(timeout: Duration) -> Result<Self, Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Create with default timeout of 30 seconds.
    pub fn with_default_timeout() -> Result<Self, Error> {
        Self::new(Duration::from_secs(30))
    }

    /// Wrap an already configured reqwest client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

fn header_map(headers: &HashMap<String, String>) -> Result<HeaderMap, Error> {
    let mut map = HeaderMap::new();
    map.insert(ACCEPT, HeaderValue::from_static("application/json"));
    for (name, value) in headers {
        let header_name = HeaderName::try_from(name.as_str())?;
        let header_value = HeaderValue::try_from(value.as_str())?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

/// Build a multi-part form from the top-level fields of `data` plus the files.
fn multipart_form(request: HttpRequest) -> Result<Form, Error> {
    let fields = match request.data {
        Some(serde_json::Value::Object(fields)) => fields,
        Some(other) => {
            return Err(Error::Multipart {
                message: format!("form data must be an object, got {}", other),
            })
        }
        None => serde_json::Map::new(),
    };

    let mut form = Form::new();
    for (name, value) in fields {
        let text = match value {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        form = form.text(name, text);
    }

    for file in request.files {
        let part = Part::bytes(file.buffer).file_name(file.originalname);
        form = form.part(file.fieldname, part);
    }

    Ok(form)
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, Error> {
        let method: http::Method = request.method.into();
        let url = url::Url::parse(&request.url)?;
        let headers = header_map(&request.headers)?;

        tracing::debug!(method = %request.method, url = %url, "sending request");

        let mut req_builder = self.client.request(method, url).headers(headers);

        if request.is_multipart() {
            req_builder = req_builder.multipart(multipart_form(request)?);
        } else if let Some(data) = &request.data {
            req_builder = req_builder.json(data);
        }

        let response = req_builder.send().await?;

        let status = response.status().as_u16();
        let status_text = response
            .status()
            .canonical_reason()
            .unwrap_or("Unknown")
            .to_string();

        let mut resp_headers = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                resp_headers.insert(name.to_string(), v.to_string());
            }
        }

        let body = response.text().await?;

        tracing::debug!(status, bytes = body.len(), "received response");

        Ok(HttpResponse {
            status,
            status_text,
            headers: resp_headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FileUpload;

    #[test]
    fn reqwest_transport_creation() {
        let transport = ReqwestTransport::with_default_timeout();
        assert!(transport.is_ok());
    }

    #[test]
    fn reqwest_transport_custom_timeout() {
        let transport = ReqwestTransport::new(Duration::from_secs(10));
        assert!(transport.is_ok());
    }

    #[test]
    fn header_map_defaults_to_json_accept() {
        let map = header_map(&HashMap::new()).unwrap();
        assert_eq!(map.get(ACCEPT).unwrap(), "application/json");
    }

    #[test]
    fn header_map_lets_callers_override_accept() {
        let mut headers = HashMap::new();
        headers.insert("Accept".to_string(), "text/plain".to_string());
        headers.insert("X-Request-Id".to_string(), "abc".to_string());

        let map = header_map(&headers).unwrap();
        assert_eq!(map.get(ACCEPT).unwrap(), "text/plain");
        assert_eq!(map.get("x-request-id").unwrap(), "abc");
    }

    #[test]
    fn header_map_rejects_invalid_names() {
        let mut headers = HashMap::new();
        headers.insert("bad header".to_string(), "x".to_string());
        assert!(matches!(
            header_map(&headers),
            Err(Error::InvalidHeaderName(_))
        ));
    }

    #[test]
    fn multipart_form_rejects_non_object_data() {
        let request = HttpRequest::post("https://gateway/v1/salads")
            .with_json_body(serde_json::json!([1, 2]))
            .with_file(FileUpload::new("photo", "a.png", vec![0]));
        assert!(matches!(
            multipart_form(request),
            Err(Error::Multipart { .. })
        ));
    }

    #[test]
    fn multipart_form_accepts_object_data() {
        let request = HttpRequest::post("https://gateway/v1/salads")
            .with_json_body(serde_json::json!({"name": "caesar", "servings": 2}))
            .with_file(FileUpload::new("photo", "a.png", vec![0]));
        assert!(multipart_form(request).is_ok());
    }
}
