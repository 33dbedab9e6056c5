//! Request deduplication.
//!
//! [`RequestCache`] keeps one shared future per [`RequestKey`]. The first
//! caller's factory is the only one that ever runs; everyone else, early or
//! late, awaits a clone of the same future and sees the same outcome.
//! Entries are never replaced or evicted, failures included.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;

use apiloom_http::Method;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;

/// Identifies a cacheable read: method plus fully resolved URL.
///
/// Headers and bodies are deliberately not part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    pub method: Method,
    pub url: String,
}

impl RequestKey {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// A cached, possibly still running, request outcome.
pub type PendingEntry<V> = Shared<BoxFuture<'static, V>>;

/// Keyed memoization of in-flight and completed requests.
pub struct RequestCache<V> {
    entries: Mutex<HashMap<RequestKey, PendingEntry<V>>>,
}

impl<V> RequestCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the entry for `key`, creating it with `factory` on first use.
    ///
    /// The lookup and insert happen under one lock, so concurrent callers
    /// with the same key can never both run `factory`.
    pub fn get_or_create<F, Fut>(&self, key: RequestKey, factory: F) -> PendingEntry<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V> + Send + 'static,
    {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get(&key) {
            tracing::trace!(%key, "request cache hit");
            return entry.clone();
        }

        tracing::debug!(%key, "request cache miss");
        let entry = factory().boxed().shared();
        entries.insert(key, entry.clone());
        entry
    }

    pub fn contains(&self, key: &RequestKey) -> bool {
        self.entries.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl<V> Default for RequestCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn factory_runs_once_per_key() {
        let cache: RequestCache<Arc<String>> = RequestCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let make = |calls: Arc<AtomicUsize>| {
            move || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Arc::new("salad".to_string()) }
            }
        };

        let a = cache.get_or_create(RequestKey::get("https://gateway/v1/foo"), make(calls.clone()));
        let b = cache.get_or_create(RequestKey::get("https://gateway/v1/foo"), make(calls.clone()));
        let (a, b) = futures::join!(a, b);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&a, &b));

        // Completed entries are still served without a new call.
        let c = cache
            .get_or_create(RequestKey::get("https://gateway/v1/foo"), make(calls.clone()))
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&a, &c));
    }

    #[tokio::test]
    async fn method_is_part_of_the_key() {
        let cache: RequestCache<u32> = RequestCache::new();

        let get = cache.get_or_create(RequestKey::get("https://gateway/x"), || async { 1 });
        let head = cache.get_or_create(
            RequestKey::new(Method::HEAD, "https://gateway/x"),
            || async { 2 },
        );

        assert_eq!(get.await, 1);
        assert_eq!(head.await, 2);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn failures_are_cached_and_shared() {
        let cache: RequestCache<Result<u32, String>> = RequestCache::new();
        let key = RequestKey::get("https://gateway/v1/broken");

        let first = cache
            .get_or_create(key.clone(), || async { Err("boom".to_string()) })
            .await;
        let second = cache
            .get_or_create(key.clone(), || async { Ok(7) })
            .await;

        assert_eq!(first, Err("boom".to_string()));
        assert_eq!(second, Err("boom".to_string()));
        assert!(cache.contains(&key));
    }

    #[test]
    fn request_key_display() {
        let key = RequestKey::get("https://gateway/v1/salads?saladId=1");
        assert_eq!(key.to_string(), "GET https://gateway/v1/salads?saladId=1");
    }
}
