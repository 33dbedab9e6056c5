//! Mock transport for testing.
//!
//! Returns predefined responses based on request matching and records every
//! request it sees, so tests can assert how many exchanges actually happened.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Error;
use crate::transport::Transport;
use crate::types::{HttpRequest, HttpResponse, Method};

/// A mock transport that returns predefined responses.
#[derive(Clone, Default)]
pub struct MockTransport {
    /// Responses keyed by method and full URL.
    responses: Arc<Mutex<HashMap<(Method, String), HttpResponse>>>,
    /// Default response when no match found.
    default_response: Arc<Mutex<Option<HttpResponse>>>,
    /// Recorded requests for verification.
    recorded_requests: Arc<Mutex<Vec<HttpRequest>>>,
    /// Error message returned for every request, if set.
    failure: Arc<Mutex<Option<String>>>,
    /// Delay applied before answering.
    delay: Arc<Mutex<Option<Duration>>>,
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a response for a method and URL.
    pub fn with_response(
        self,
        method: Method,
        url: impl Into<String>,
        response: HttpResponse,
    ) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert((method, url.into()), response);
        self
    }

    /// Add a GET response for a URL.
    pub fn with_get(self, url: impl Into<String>, response: HttpResponse) -> Self {
        self.with_response(Method::GET, url, response)
    }

    /// Set a default response when no URL matches.
    pub fn with_default_response(self, response: HttpResponse) -> Self {
        *self.default_response.lock().unwrap() = Some(response);
        self
    }

    /// Configure to fail all requests with a transport error.
    pub fn fail_with(self, message: impl Into<String>) -> Self {
        *self.failure.lock().unwrap() = Some(message.into());
        self
    }

    /// Delay every response, keeping requests in flight across scheduler turns.
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock().unwrap() = Some(delay);
        self
    }

    /// Get all recorded requests.
    pub fn recorded_requests(&self) -> Vec<HttpRequest> {
        self.recorded_requests.lock().unwrap().clone()
    }

    /// Number of requests sent to `url`, any method.
    pub fn calls(&self, url: &str) -> usize {
        self.recorded_requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url == url)
            .count()
    }

    /// Total number of requests sent.
    pub fn total_calls(&self) -> usize {
        self.recorded_requests.lock().unwrap().len()
    }

    /// Clear recorded requests.
    pub fn clear_recorded(&self) {
        self.recorded_requests.lock().unwrap().clear();
    }

    /// A 200 response whose body is `body` serialized as JSON.
    pub fn json_response(body: serde_json::Value) -> HttpResponse {
        HttpResponse::new(200, body.to_string())
    }

    /// A 200 envelope response `{"data": data}`.
    pub fn data_response(data: serde_json::Value) -> HttpResponse {
        Self::json_response(serde_json::json!({ "data": data }))
    }

    /// A response with the given status and raw body.
    pub fn status_response(status: u16, body: &str) -> HttpResponse {
        HttpResponse::new(status, body)
    }

    /// Create a 404 Not Found response.
    pub fn not_found() -> HttpResponse {
        Self::status_response(404, r#"{"errors":["Not Found"]}"#)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, Error> {
        self.recorded_requests.lock().unwrap().push(request.clone());

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let failure = self.failure.lock().unwrap().clone();
        if let Some(message) = failure {
            return Err(Error::Transport { message });
        }

        let key = (request.method, request.url);
        if let Some(response) = self.responses.lock().unwrap().get(&key) {
            return Ok(response.clone());
        }

        if let Some(ref response) = *self.default_response.lock().unwrap() {
            return Ok(response.clone());
        }

        Ok(Self::not_found())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_transport_returns_configured_response() {
        let transport = MockTransport::new().with_get(
            "https://gateway/v1/salads/5",
            MockTransport::data_response(serde_json::json!({"spicy": true})),
        );

        let response = transport
            .send(HttpRequest::get("https://gateway/v1/salads/5"))
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, r#"{"data":{"spicy":true}}"#);
    }

    #[tokio::test]
    async fn mock_transport_matches_on_method() {
        let transport = MockTransport::new().with_response(
            Method::DELETE,
            "https://gateway/v1/salads/5",
            MockTransport::status_response(204, ""),
        );

        let get = transport
            .send(HttpRequest::get("https://gateway/v1/salads/5"))
            .await
            .unwrap();
        let delete = transport
            .send(HttpRequest::delete("https://gateway/v1/salads/5"))
            .await
            .unwrap();

        assert_eq!(get.status, 404);
        assert_eq!(delete.status, 204);
    }

    #[tokio::test]
    async fn mock_transport_returns_default_response() {
        let transport = MockTransport::new()
            .with_default_response(MockTransport::json_response(serde_json::json!({})));

        let response = transport
            .send(HttpRequest::get("https://gateway/anything"))
            .await
            .unwrap();
        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn mock_transport_fails_when_configured() {
        let transport = MockTransport::new().fail_with("connection reset");
        let err = transport
            .send(HttpRequest::get("https://gateway/v1/foo"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("connection reset"));
        assert_eq!(transport.total_calls(), 1);
    }

    #[tokio::test]
    async fn mock_transport_counts_calls_per_url() {
        let transport = MockTransport::new();
        transport.send(HttpRequest::get("https://gateway/a")).await.unwrap();
        transport.send(HttpRequest::get("https://gateway/a")).await.unwrap();
        transport.send(HttpRequest::post("https://gateway/b")).await.unwrap();

        assert_eq!(transport.calls("https://gateway/a"), 2);
        assert_eq!(transport.calls("https://gateway/b"), 1);
        assert_eq!(transport.total_calls(), 3);

        transport.clear_recorded();
        assert_eq!(transport.total_calls(), 0);
    }
}
