//! Batch collation of single-key lookups.
//!
//! A [`BatchLoader`] is bound to one resource path and one key field. Every
//! [`BatchLoader::load`] made while a batch is open joins that batch; when the
//! collation window closes, the batch goes out as one GET
//! (`{resource}?{key_field}=k1,k2,...`) through the session's
//! [`crate::RequestCache`], and the returned items are fanned back out to
//! each key by the value of their `key_field`.
//!
//! ```text
//! load("1") ─┐
//! load("2") ─┼─ open batch {1, 2} ── window closes ── GET dressings?saladId=1,2
//! load("1") ─┘      (memo hit)                              │
//!                                                           ▼
//!                                   "1" → [items with saladId 1]
//!                                   "2" → [items with saladId 2]
//! ```
//!
//! Each key's future is memoized for the loader's lifetime, so loading the
//! same key again, during or after its batch, returns the very same result.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::oneshot;

use crate::api::HttpApi;
use crate::config::KeyStyle;
use crate::error::{ApiError, Result};
use crate::path;

/// Items matching one key, or `None` when the batch payload was null.
pub type KeyedResult = Option<Arc<Vec<Value>>>;

/// A memoized per-key load.
pub type LoadFuture = Shared<BoxFuture<'static, Result<KeyedResult>>>;

type Groups = Arc<HashMap<String, Arc<Vec<Value>>>>;
type BatchOutcome = Result<Option<Groups>>;

struct OpenBatch {
    id: u64,
    keys: Vec<String>,
    sender: oneshot::Sender<BatchOutcome>,
    outcome: Shared<BoxFuture<'static, BatchOutcome>>,
}

impl OpenBatch {
    fn new(id: u64) -> Self {
        let (sender, receiver) = oneshot::channel();
        let outcome = receiver
            .map(|received| {
                received.unwrap_or_else(|_| {
                    Err(ApiError::Scheduler {
                        message: "batch dropped before dispatch".to_string(),
                    })
                })
            })
            .boxed()
            .shared();
        Self {
            id,
            keys: Vec::new(),
            sender,
            outcome,
        }
    }
}

#[derive(Default)]
struct LoaderState {
    memo: HashMap<String, LoadFuture>,
    open: Option<OpenBatch>,
    next_batch_id: u64,
}

struct LoaderInner {
    api: HttpApi,
    resource_path: String,
    key_field: String,
    state: Mutex<LoaderState>,
}

/// Collates concurrent single-key loads into multi-key requests.
///
/// Cloning is cheap; clones share the memo and the open batch.
///
/// `load` spawns the dispatch task onto the current Tokio runtime. Outside a
/// runtime the returned future resolves to [`ApiError::Scheduler`] and the
/// key is not memoized.
#[derive(Clone)]
pub struct BatchLoader {
    inner: Arc<LoaderInner>,
}

impl std::fmt::Debug for BatchLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchLoader")
            .field("resource_path", &self.inner.resource_path)
            .field("key_field", &self.inner.key_field)
            .finish()
    }
}

impl BatchLoader {
    pub fn new(
        api: HttpApi,
        resource_path: impl Into<String>,
        key_field: impl Into<String>,
    ) -> Self {
        Self {
            inner: Arc::new(LoaderInner {
                api,
                resource_path: resource_path.into(),
                key_field: key_field.into(),
                state: Mutex::new(LoaderState::default()),
            }),
        }
    }

    pub fn resource_path(&self) -> &str {
        &self.inner.resource_path
    }

    pub fn key_field(&self) -> &str {
        &self.inner.key_field
    }

    /// Load the items whose key field equals `key`.
    ///
    /// Registration happens before this returns; only the returned future
    /// waits on the network.
    pub fn load(&self, key: impl Into<String>) -> LoadFuture {
        let key = key.into();
        let batch_config = &self.inner.api.config().batch;

        let mut state = self.inner.state.lock();
        if let Some(pending) = state.memo.get(&key) {
            tracing::trace!(key = %key, "batch loader memo hit");
            return pending.clone();
        }

        let Ok(runtime) = Handle::try_current() else {
            tracing::debug!(key = %key, "batch loader used outside a tokio runtime");
            return future::ready(Err(ApiError::Scheduler {
                message: "no tokio runtime to dispatch the batch on".to_string(),
            }))
            .boxed()
            .shared();
        };

        let mut opened = None;
        let mut batch = match state.open.take() {
            Some(batch) => batch,
            None => {
                let id = state.next_batch_id;
                state.next_batch_id += 1;
                opened = Some(id);
                OpenBatch::new(id)
            }
        };
        batch.keys.push(key.clone());

        let pending = {
            let key = key.clone();
            batch
                .outcome
                .clone()
                .map(move |outcome| {
                    outcome.map(|groups| {
                        groups.map(|groups| groups.get(&key).cloned().unwrap_or_default())
                    })
                })
                .boxed()
                .shared()
        };
        state.memo.insert(key, pending.clone());

        let ready = if batch.keys.len() >= batch_config.max_keys.max(1) {
            Some(batch)
        } else {
            state.open = Some(batch);
            None
        };
        drop(state);

        if let Some(id) = opened {
            self.schedule(&runtime, id);
        }
        if let Some(batch) = ready {
            runtime.spawn(self.dispatch(batch));
        }

        pending
    }

    /// Load several keys, collated into as few batches as the window allows.
    pub fn load_many<I, K>(&self, keys: I) -> impl Future<Output = Vec<Result<KeyedResult>>>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let pending: Vec<LoadFuture> = keys.into_iter().map(|key| self.load(key)).collect();
        futures::future::join_all(pending)
    }

    /// Close batch `id` once the collation window has passed.
    fn schedule(&self, runtime: &Handle, id: u64) {
        let loader = self.clone();
        let delay = self.inner.api.config().batch.delay;
        runtime.spawn(async move {
            if delay.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(delay).await;
            }

            let batch = {
                let mut state = loader.inner.state.lock();
                if state.open.as_ref().is_some_and(|batch| batch.id == id) {
                    state.open.take()
                } else {
                    None
                }
            };

            if let Some(batch) = batch {
                loader.dispatch(batch).await;
            }
        });
    }

    /// Path of the combined request for `keys`.
    fn batch_path(&self, keys: &[String]) -> String {
        let field = self.inner.key_field.as_str();
        match self.inner.api.config().batch.key_style {
            KeyStyle::Comma => path::make_path(&self.inner.resource_path, &[(field, keys.join(","))]),
            KeyStyle::Repeated => {
                let pairs: Vec<(&str, &str)> = keys.iter().map(|k| (field, k.as_str())).collect();
                path::make_path(&self.inner.resource_path, &pairs)
            }
        }
    }

    fn dispatch(&self, batch: OpenBatch) -> impl Future<Output = ()> + Send + 'static {
        let mut sorted = batch.keys.clone();
        sorted.sort();
        sorted.dedup();

        let batch_path = self.batch_path(&sorted);
        tracing::debug!(
            batch = batch.id,
            keys = sorted.len(),
            path = %batch_path,
            "dispatching batch"
        );

        let response = self.inner.api.get_envelope(&batch_path);
        let key_field = self.inner.key_field.clone();

        async move {
            let outcome = match response.await {
                Ok(envelope) => Ok(fan_out(envelope.data.as_ref(), &key_field, &batch.keys)),
                Err(e) => {
                    tracing::debug!(batch = batch.id, error = %e, "batch failed");
                    Err(e)
                }
            };
            if batch.sender.send(outcome).is_err() {
                tracing::trace!(batch = batch.id, "batch outcome had no listeners");
            }
        }
    }
}

/// Textual form of a key field value, for matching against load keys.
fn key_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Partition `data` by `key_field`, giving every requested key an entry.
///
/// A null or absent payload yields `None` for the whole batch; a key with
/// no matching items maps to an empty list. Duplicates are kept in
/// encounter order.
fn fan_out(data: Option<&Value>, key_field: &str, keys: &[String]) -> Option<Groups> {
    let items = match data {
        None | Some(Value::Null) => return None,
        Some(Value::Array(items)) => items.as_slice(),
        Some(single) => std::slice::from_ref(single),
    };

    let mut grouped: HashMap<String, Vec<Value>> = HashMap::new();
    for item in items {
        if let Some(key) = item.get(key_field).and_then(key_text) {
            grouped.entry(key).or_default().push(item.clone());
        }
    }

    let groups = keys
        .iter()
        .map(|key| {
            let items = grouped.remove(key).unwrap_or_default();
            (key.clone(), Arc::new(items))
        })
        .collect();

    Some(Arc::new(groups))
}
