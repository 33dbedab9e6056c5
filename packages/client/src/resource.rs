//! CRUD helpers for one remote collection.
//!
//! A [`Resource`] is plain configuration: an [`Endpoint`] plus the session it
//! talks through. Reads go through the session's request cache; writes go
//! straight to the transport. Resource-specific behavior is added by wrapping
//! a `Resource` in another type and delegating to it.
//!
//! ```ignore
//! let salads = Resource::new(api.clone(), "salads");
//!
//! salads.get(Some("5")).await?;                 // GET    /salads/5 (cached)
//! salads.create(&new_salad).await?;             // POST   /salads
//! salads.update("5", &patch).await?;            // PATCH  /salads/5
//! salads.set("5", &salad).await?;               // PUT    /salads/5
//! salads.delete("5").await?;                    // DELETE /salads/5
//! salads.connection(ConnectionArgs::first(10)).await?;
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use apiloom_http::{FileUpload, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::api::HttpApi;
use crate::connection::{connection_from_slice, Connection, ConnectionArgs};
use crate::error::{ApiError, Result};
use crate::loader::BatchLoader;
use crate::path;

type PathFn = dyn Fn(Option<&str>) -> String + Send + Sync;

/// Where a resource lives.
#[derive(Clone)]
pub enum Endpoint {
    /// A collection path; item paths are `{path}/{id}`.
    Static(String),
    /// Computes the path for an optional item id.
    Dynamic(Arc<PathFn>),
}

impl Endpoint {
    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn(Option<&str>) -> String + Send + Sync + 'static,
    {
        Endpoint::Dynamic(Arc::new(f))
    }

    pub fn resolve(&self, id: Option<&str>) -> String {
        match (self, id) {
            (Endpoint::Static(base), Some(id)) => path::join(&[base, id]),
            (Endpoint::Static(base), None) => base.clone(),
            (Endpoint::Dynamic(f), id) => f(id),
        }
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Static(path) => f.debug_tuple("Static").field(path).finish(),
            Endpoint::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

impl From<&str> for Endpoint {
    fn from(path: &str) -> Self {
        Endpoint::Static(path.to_string())
    }
}

impl From<String> for Endpoint {
    fn from(path: String) -> Self {
        Endpoint::Static(path)
    }
}

/// CRUD access to one remote collection.
#[derive(Debug, Clone)]
pub struct Resource {
    api: HttpApi,
    endpoint: Endpoint,
}

impl Resource {
    pub fn new(api: HttpApi, endpoint: impl Into<Endpoint>) -> Self {
        Self {
            api,
            endpoint: endpoint.into(),
        }
    }

    pub fn api(&self) -> &HttpApi {
        &self.api
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn path(&self, id: Option<&str>) -> String {
        self.endpoint.resolve(id)
    }

    /// `/{path(id)}/{suffix}`
    pub fn sub_path(&self, id: &str, suffix: &str) -> String {
        path::join(&["/", &self.path(Some(id)), suffix])
    }

    /// Cached GET of one item, or of the collection when `id` is `None`.
    pub fn get(&self, id: Option<&str>) -> impl Future<Output = Result<Value>> + Send + 'static {
        self.api.get(&self.path(id))
    }

    pub fn get_as<T>(&self, id: Option<&str>) -> impl Future<Output = Result<T>> + Send + 'static
    where
        T: DeserializeOwned,
    {
        self.api.get_as(&self.path(id))
    }

    /// Page through the full collection in memory.
    pub fn connection(
        &self,
        args: ConnectionArgs,
    ) -> impl Future<Output = Result<Connection<Value>>> + Send + 'static {
        let list = self.get(None);
        async move {
            let items = match list.await? {
                Value::Array(items) => items,
                Value::Null => Vec::new(),
                other => {
                    return Err(ApiError::Decode {
                        message: format!("expected a list, got {}", other),
                    })
                }
            };
            Ok(connection_from_slice(&items, &args))
        }
    }

    async fn write(&self, method: Method, id: Option<&str>, data: Option<Value>) -> Result<Value> {
        let envelope = self.api.request(method, &self.path(id), data).await?;
        Ok(envelope.data_or_null())
    }

    pub async fn create<T: Serialize>(&self, data: &T) -> Result<Value> {
        let data = serde_json::to_value(data)?;
        self.write(Method::POST, None, Some(data)).await
    }

    /// POST `data` and `files` together as multi-part form data.
    pub async fn create_with_files<T: Serialize>(
        &self,
        data: &T,
        files: Vec<FileUpload>,
    ) -> Result<Value> {
        let data = serde_json::to_value(data)?;
        let envelope = self
            .api
            .request_with_files(Method::POST, &self.path(None), data, files)
            .await?;
        Ok(envelope.data_or_null())
    }

    pub async fn update<T: Serialize>(&self, id: &str, data: &T) -> Result<Value> {
        let data = serde_json::to_value(data)?;
        self.write(Method::PATCH, Some(id), Some(data)).await
    }

    pub async fn set<T: Serialize>(&self, id: &str, data: &T) -> Result<Value> {
        let data = serde_json::to_value(data)?;
        self.write(Method::PUT, Some(id), Some(data)).await
    }

    /// DELETE one item. An empty response resolves to `Value::Null`.
    pub async fn delete(&self, id: &str) -> Result<Value> {
        self.write(Method::DELETE, Some(id), None).await
    }

    /// A loader for this collection keyed by `key_field`.
    pub fn create_arg_loader(&self, key_field: impl Into<String>) -> BatchLoader {
        self.api.create_arg_loader(self.path(None), key_field)
    }
}
