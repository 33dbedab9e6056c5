//! Client configuration.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

/// How a batch's keys are written into the query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStyle {
    /// `?saladId=1,2,3`
    #[default]
    Comma,
    /// `?saladId=1&saladId=2&saladId=3`
    Repeated,
}

/// Collation window for [`crate::BatchLoader`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// How long a batch stays open after its first key.
    ///
    /// `Duration::ZERO` closes the batch after a single scheduler turn, which
    /// only collates reliably on a current-thread runtime.
    #[serde(with = "millis")]
    pub delay: Duration,

    /// A batch is dispatched as soon as it holds this many keys.
    pub max_keys: usize,

    pub key_style: KeyStyle,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(1),
            max_keys: 100,
            key_style: KeyStyle::Comma,
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Configuration for an [`crate::HttpApi`].
///
/// Requests go to `{origin}{api_base}/{path}`; URLs handed out to end users
/// are built on `external_origin` instead.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Prefix inserted before every path, e.g. `/v1`.
    pub api_base: String,

    /// Origin the client talks to, e.g. `https://gateway`.
    pub origin: String,

    /// Publicly reachable origin, e.g. `https://example.com`.
    pub external_origin: String,

    /// Headers sent with every request.
    pub default_headers: HashMap<String, String>,

    pub batch: BatchConfig,
}

impl ApiConfig {
    pub fn new(origin: impl Into<String>, api_base: impl Into<String>) -> Self {
        let origin = origin.into();
        Self {
            external_origin: origin.clone(),
            origin,
            api_base: api_base.into(),
            ..Default::default()
        }
    }

    pub fn with_external_origin(mut self, external_origin: impl Into<String>) -> Self {
        self.external_origin = external_origin.into();
        self
    }

    /// Add a default header sent with every request
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }

    pub fn with_batch(mut self, batch: BatchConfig) -> Self {
        self.batch = batch;
        self
    }
}
