//! Relay-style cursor pagination over an in-memory list.
//!
//! Cursors are `base64("arrayconnection:<offset>")`, so they are
//! interchangeable with the ones GraphQL servers commonly hand out for
//! array-backed connections.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const CURSOR_PREFIX: &str = "arrayconnection:";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionArgs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
}

impl ConnectionArgs {
    pub fn first(n: usize) -> Self {
        Self {
            first: Some(n),
            ..Default::default()
        }
    }

    pub fn last(n: usize) -> Self {
        Self {
            last: Some(n),
            ..Default::default()
        }
    }

    pub fn after(mut self, cursor: impl Into<String>) -> Self {
        self.after = Some(cursor.into());
        self
    }

    pub fn before(mut self, cursor: impl Into<String>) -> Self {
        self.before = Some(cursor.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge<T> {
    pub cursor: String,
    pub node: T,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
    pub has_previous_page: bool,
    pub has_next_page: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<T> {
    pub edges: Vec<Edge<T>>,
    pub page_info: PageInfo,
    /// Always empty for unpaginated sources.
    pub meta: Map<String, Value>,
}

pub fn offset_to_cursor(offset: usize) -> String {
    STANDARD.encode(format!("{}{}", CURSOR_PREFIX, offset))
}

pub fn cursor_to_offset(cursor: &str) -> Option<usize> {
    let decoded = STANDARD.decode(cursor).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    text.strip_prefix(CURSOR_PREFIX)?.parse().ok()
}

/// Slice `items` according to `args`.
///
/// Unreadable cursors are ignored, as if they had not been given.
pub fn connection_from_slice<T: Clone>(items: &[T], args: &ConnectionArgs) -> Connection<T> {
    let length = items.len();
    let after = args.after.as_deref().and_then(cursor_to_offset);
    let before = args.before.as_deref().and_then(cursor_to_offset);

    let lower_bound = after.map_or(0, |offset| offset.saturating_add(1));
    let upper_bound = before.map_or(length, |offset| offset.min(length));

    let mut start = lower_bound.min(length);
    let mut end = upper_bound;

    if let Some(first) = args.first {
        end = end.min(start.saturating_add(first));
    }
    if let Some(last) = args.last {
        start = start.max(end.saturating_sub(last));
    }

    let edges: Vec<Edge<T>> = if start < end {
        items[start..end]
            .iter()
            .enumerate()
            .map(|(index, node)| Edge {
                cursor: offset_to_cursor(start + index),
                node: node.clone(),
            })
            .collect()
    } else {
        Vec::new()
    };

    let page_info = PageInfo {
        start_cursor: edges.first().map(|e| e.cursor.clone()),
        end_cursor: edges.last().map(|e| e.cursor.clone()),
        has_previous_page: args.last.is_some() && start > lower_bound,
        has_next_page: args.first.is_some() && end < upper_bound,
    };

    Connection {
        edges,
        page_info,
        meta: Map::new(),
    }
}
