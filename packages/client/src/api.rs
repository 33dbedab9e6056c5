//! The per-session gateway client.
//!
//! An [`HttpApi`] owns one [`RequestCache`] and hands clones of itself to
//! resources and loaders, so everything created from one instance shares the
//! same deduplication state. Build a fresh instance per logical session
//! (for example per incoming request in a server) to keep sessions apart.

use std::future::Future;
use std::sync::Arc;

use apiloom_http::{FileUpload, HttpRequest, Method, Transport};
use futures::future::{self, BoxFuture, FutureExt};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::cache::{PendingEntry, RequestCache, RequestKey};
use crate::config::ApiConfig;
use crate::envelope::ResponseEnvelope;
use crate::error::{ApiError, Result};
use crate::loader::BatchLoader;
use crate::path;

/// Outcome shared by every caller of one cached GET.
pub type CachedResult = Result<Arc<ResponseEnvelope>>;

/// A cached GET, possibly still in flight.
pub type CachedResponse = PendingEntry<CachedResult>;

struct Inner {
    config: ApiConfig,
    transport: Option<Arc<dyn Transport>>,
    cache: RequestCache<CachedResult>,
}

/// Gateway client for one session.
///
/// Cloning is cheap and clones share the request cache.
///
/// # Example
///
/// ```ignore
/// let api = HttpApi::with_transport(
///     ApiConfig::new("https://gateway", "/v1"),
///     ReqwestTransport::with_default_timeout()?,
/// );
///
/// // Both calls resolve from a single GET.
/// let (a, b) = tokio::join!(api.get("salads/5"), api.get("salads/5"));
/// ```
#[derive(Clone)]
pub struct HttpApi {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for HttpApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpApi")
            .field("config", &self.inner.config)
            .field("has_transport", &self.inner.transport.is_some())
            .field("cached_requests", &self.inner.cache.len())
            .finish()
    }
}

impl HttpApi {
    /// Create a client with no transport. Every request fails with
    /// [`ApiError::NotImplemented`]; path helpers still work.
    pub fn new(config: ApiConfig) -> Self {
        Self::build(config, None)
    }

    pub fn with_transport<T: Transport + 'static>(config: ApiConfig, transport: T) -> Self {
        Self::build(config, Some(Arc::new(transport)))
    }

    /// Create a client over a transport shared with other sessions.
    pub fn with_shared_transport(config: ApiConfig, transport: Arc<dyn Transport>) -> Self {
        Self::build(config, Some(transport))
    }

    fn build(config: ApiConfig, transport: Option<Arc<dyn Transport>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                transport,
                cache: RequestCache::new(),
            }),
        }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    pub fn cache(&self) -> &RequestCache<CachedResult> {
        &self.inner.cache
    }

    /// Append `query` to `path`, keeping any query it already has.
    pub fn make_path<K, V>(&self, path: &str, query: &[(K, V)]) -> String
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        path::make_path(path, query)
    }

    /// Absolute URL the client sends requests for `path` to.
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let config = &self.inner.config;
        format!(
            "{}{}",
            config.origin.trim_end_matches('/'),
            path::join(&["/", &config.api_base, path])
        )
    }

    /// Publicly reachable URL for `path`, for links handed to end users.
    pub fn external_url<K, V>(&self, path: &str, query: &[(K, V)]) -> String
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let config = &self.inner.config;
        format!(
            "{}{}",
            config.external_origin.trim_end_matches('/'),
            path::join(&["/", &config.api_base, &path::make_path(path, query)])
        )
    }

    fn prepare(&self, method: Method, path: &str) -> HttpRequest {
        let mut request = HttpRequest::new(method, self.url_for(path));
        request.headers = self.inner.config.default_headers.clone();
        request
    }

    /// Send `request` and decode the envelope. Never cached.
    ///
    /// Without a transport this resolves immediately to `NotImplemented`.
    pub fn send(&self, request: HttpRequest) -> BoxFuture<'static, Result<ResponseEnvelope>> {
        let Some(transport) = self.inner.transport.clone() else {
            return future::ready(Err(ApiError::NotImplemented {
                capability: "request",
            }))
            .boxed();
        };

        async move {
            let method = request.method;
            let url = request.url.clone();
            let response = transport.send(request).await.map_err(|e| {
                tracing::debug!(%method, %url, error = %e, "transport failure");
                ApiError::from(e)
            })?;
            ResponseEnvelope::parse(response.status, &response.body).into_result()
        }
        .boxed()
    }

    /// Uncached request against `path` with an optional JSON body.
    pub fn request(
        &self,
        method: Method,
        path: &str,
        data: Option<Value>,
    ) -> BoxFuture<'static, Result<ResponseEnvelope>> {
        let mut request = self.prepare(method, path);
        request.data = data;
        self.send(request)
    }

    /// Uncached request sending `data` and `files` as multi-part form data.
    pub fn request_with_files(
        &self,
        method: Method,
        path: &str,
        data: Value,
        files: Vec<FileUpload>,
    ) -> BoxFuture<'static, Result<ResponseEnvelope>> {
        let mut request = self.prepare(method, path);
        request.data = Some(data);
        request.files = files;
        self.send(request)
    }

    /// Cached GET of `path`.
    ///
    /// The cache entry is looked up or created before this returns, so every
    /// call made before the first one is awaited shares one exchange.
    pub fn get_envelope(&self, path: &str) -> CachedResponse {
        let request = self.prepare(Method::GET, path);
        let key = RequestKey::get(request.url.clone());
        self.inner.cache.get_or_create(key, || {
            let response = self.send(request);
            async move { response.await.map(Arc::new) }
        })
    }

    /// Cached GET of `path`, resolving to the envelope's `data`.
    pub fn get(&self, path: &str) -> impl Future<Output = Result<Value>> + Send + 'static {
        let entry = self.get_envelope(path);
        async move { Ok(entry.await?.data_or_null()) }
    }

    /// Cached GET of `path`, deserializing `data` into `T`.
    pub fn get_as<T>(&self, path: &str) -> impl Future<Output = Result<T>> + Send + 'static
    where
        T: DeserializeOwned,
    {
        let entry = self.get_envelope(path);
        async move { Ok(serde_json::from_value(entry.await?.data_or_null())?) }
    }

    /// A loader batching single-key lookups against `resource_path`, keyed
    /// by `key_field` of each returned item.
    pub fn create_arg_loader(
        &self,
        resource_path: impl Into<String>,
        key_field: impl Into<String>,
    ) -> BatchLoader {
        BatchLoader::new(self.clone(), resource_path, key_field)
    }
}
