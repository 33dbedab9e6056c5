use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// HTTP method for requests
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    GET,
    HEAD,
    POST,
    PUT,
    DELETE,
    CONNECT,
    OPTIONS,
    TRACE,
    PATCH,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::HEAD => "HEAD",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::CONNECT => "CONNECT",
            Method::OPTIONS => "OPTIONS",
            Method::TRACE => "TRACE",
            Method::PATCH => "PATCH",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::GET),
            "HEAD" => Ok(Method::HEAD),
            "POST" => Ok(Method::POST),
            "PUT" => Ok(Method::PUT),
            "DELETE" => Ok(Method::DELETE),
            "CONNECT" => Ok(Method::CONNECT),
            "OPTIONS" => Ok(Method::OPTIONS),
            "TRACE" => Ok(Method::TRACE),
            "PATCH" => Ok(Method::PATCH),
            _ => Err(Error::InvalidMethod {
                method: s.to_string(),
            }),
        }
    }
}

impl From<Method> for http::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::GET => http::Method::GET,
            Method::HEAD => http::Method::HEAD,
            Method::POST => http::Method::POST,
            Method::PUT => http::Method::PUT,
            Method::DELETE => http::Method::DELETE,
            Method::CONNECT => http::Method::CONNECT,
            Method::OPTIONS => http::Method::OPTIONS,
            Method::TRACE => http::Method::TRACE,
            Method::PATCH => http::Method::PATCH,
        }
    }
}

/// A file to send as one part of a multi-part form body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    /// Form field the file is attached under
    pub fieldname: String,

    /// File name reported to the server
    pub originalname: String,

    pub buffer: Vec<u8>,
}

impl FileUpload {
    pub fn new(
        fieldname: impl Into<String>,
        originalname: impl Into<String>,
        buffer: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            fieldname: fieldname.into(),
            originalname: originalname.into(),
            buffer: buffer.into(),
        }
    }
}

/// An outgoing HTTP request
///
/// `data` is sent as a JSON body, unless `files` is non-empty, in which case
/// the fields of `data` and the files are sent together as multi-part form
/// data. Files without data are not sent.
#[derive(Debug, Clone, Default)]
pub struct HttpRequest {
    pub method: Method,

    /// Absolute URL including any query string
    pub url: String,

    pub headers: HashMap<String, String>,

    pub data: Option<serde_json::Value>,

    pub files: Vec<FileUpload>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::PUT, url)
    }

    pub fn patch(url: impl Into<String>) -> Self {
        Self::new(Method::PATCH, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    pub fn with_body(mut self, body: impl Serialize) -> Result<Self, serde_json::Error> {
        self.data = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn with_json_body(mut self, body: serde_json::Value) -> Self {
        self.data = Some(body);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_file(mut self, file: FileUpload) -> Self {
        self.files.push(file);
        self
    }

    /// Whether this request will be encoded as multi-part form data
    pub fn is_multipart(&self) -> bool {
        self.data.is_some() && !self.files.is_empty()
    }
}

/// HTTP response from a request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,

    /// Status text (e.g., "OK", "Not Found")
    pub status_text: String,

    /// Response headers
    pub headers: HashMap<String, String>,

    /// Raw body text, empty when the server sent no content
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        let status_text = http::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown")
            .to_string();
        Self {
            status,
            status_text,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// Check if the response status indicates success (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Check if the response status indicates a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    /// Check if the response status indicates a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }

    /// Try to deserialize the body into a specific type
    pub fn json<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_round_trips_through_str() {
        for method in [
            Method::GET,
            Method::HEAD,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::CONNECT,
            Method::OPTIONS,
            Method::TRACE,
            Method::PATCH,
        ] {
            assert_eq!(method.as_str().parse::<Method>().unwrap(), method);
        }
        assert_eq!("patch".parse::<Method>().unwrap(), Method::PATCH);
    }

    #[test]
    fn unknown_method_is_rejected() {
        let err = "BREW".parse::<Method>().unwrap_err();
        assert!(matches!(err, Error::InvalidMethod { method } if method == "BREW"));
    }

    #[test]
    fn multipart_requires_data_and_files() {
        let file = FileUpload::new("photo", "salad.png", vec![1, 2, 3]);

        let files_only = HttpRequest::post("https://gateway/v1/salads").with_file(file.clone());
        assert!(!files_only.is_multipart());

        let both = files_only.with_json_body(serde_json::json!({"name": "caesar"}));
        assert!(both.is_multipart());

        let data_only =
            HttpRequest::post("https://gateway/v1/salads").with_json_body(serde_json::json!({}));
        assert!(!data_only.is_multipart());
    }

    #[test]
    fn response_status_classes() {
        assert!(HttpResponse::new(204, "").is_success());
        assert!(HttpResponse::new(409, "{}").is_client_error());
        assert!(HttpResponse::new(502, "").is_server_error());
        assert_eq!(HttpResponse::new(404, "").status_text, "Not Found");
    }

    #[test]
    fn response_json_reads_body_text() {
        let response = HttpResponse::new(200, r#"{"data":{"spicy":true}}"#);
        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["data"]["spicy"], true);
    }
}
