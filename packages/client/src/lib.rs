//! # apiloom-client
//!
//! Client-side access layer for gateways that wrap every response in a
//! `{ "data": ..., "errors": [...] }` envelope.
//!
//! ## Layers
//!
//! - [`ResponseEnvelope`] decodes a raw response, tolerating malformed bodies.
//! - [`RequestCache`] collapses identical GETs into one exchange.
//! - [`BatchLoader`] collates concurrent single-key loads into one multi-key
//!   GET and fans the result back out by key.
//! - [`Resource`] builds paths for a collection and exposes CRUD helpers.
//!
//! All state lives in an [`HttpApi`] instance; create one per session.
//!
//! ## Example
//!
//! ```ignore
//! use apiloom_client::{ApiConfig, HttpApi, Resource};
//! use apiloom_http::ReqwestTransport;
//!
//! let api = HttpApi::with_transport(
//!     ApiConfig::new("https://gateway", "/v1"),
//!     ReqwestTransport::with_default_timeout()?,
//! );
//!
//! let salads = Resource::new(api.clone(), "salads");
//! let salad = salads.get(Some("1")).await?;
//!
//! // One GET /v1/dressings?saladId=1,2 serves both lookups.
//! let dressings = api.create_arg_loader("dressings", "saladId");
//! let (one, two) = tokio::join!(dressings.load("1"), dressings.load("2"));
//! ```

pub mod api;
pub mod cache;
pub mod config;
pub mod connection;
pub mod envelope;
pub mod error;
pub mod loader;
pub mod path;
pub mod resource;

pub use api::{CachedResponse, CachedResult, HttpApi};
pub use cache::{PendingEntry, RequestCache, RequestKey};
pub use config::{ApiConfig, BatchConfig, KeyStyle};
pub use connection::{connection_from_slice, Connection, ConnectionArgs, Edge, PageInfo};
pub use envelope::ResponseEnvelope;
pub use error::{ApiError, HttpError, Result};
pub use loader::{BatchLoader, KeyedResult, LoadFuture};
pub use resource::{Endpoint, Resource};
