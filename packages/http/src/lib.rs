//! # apiloom-http
//!
//! HTTP transport for the apiloom gateway client.
//!
//! This crate owns the single network primitive the client layers depend on:
//! send one request, get back status, headers and the raw body. It knows
//! nothing about envelopes, caching or batching.
//!
//! ## Request bodies
//!
//! - `data` alone is encoded as JSON with `Content-Type: application/json`.
//! - `data` plus `files` is encoded as multi-part form data: every top-level
//!   field of `data` becomes a text part and every file becomes a file part.
//! - Every request carries `Accept: application/json` unless overridden.
//!
//! ## Example
//!
//! ```ignore
//! use apiloom_http::{HttpRequest, ReqwestTransport, Transport};
//!
//! let transport = ReqwestTransport::with_default_timeout()?;
//! let response = transport
//!     .send(HttpRequest::get("https://gateway/v1/salads/5"))
//!     .await?;
//! assert!(response.is_success());
//! ```

pub mod error;
pub mod transport;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use error::Error;
pub use transport::{ReqwestTransport, Transport};
pub use types::{FileUpload, HttpRequest, HttpResponse, Method};
