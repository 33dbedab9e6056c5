//! Path and query-string construction.

use url::form_urlencoded;

/// Join path segments with single slashes, keeping a leading slash only if
/// the first segment had one.
pub fn join(segments: &[&str]) -> String {
    let mut out = String::new();
    for segment in segments {
        let trimmed = segment.trim_matches('/');
        if trimmed.is_empty() {
            if out.is_empty() && segment.starts_with('/') {
                out.push('/');
            }
            continue;
        }
        if out.is_empty() {
            if segment.starts_with('/') {
                out.push('/');
            }
        } else if !out.ends_with('/') {
            out.push('/');
        }
        out.push_str(trimmed);
    }
    out
}

/// Append `query` to `path`, keeping any parameters `path` already carries.
///
/// `make_path("foo/1?bar=1", [("baz", "quz")])` is `"foo/1?bar=1&baz=quz"`.
pub fn make_path<K, V>(path: &str, query: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    if query.is_empty() {
        return path.to_string();
    }

    let (base, existing) = match path.split_once('?') {
        Some((base, existing)) => (base, existing),
        None => (path, ""),
    };

    let mut serializer = form_urlencoded::Serializer::new(existing.to_string());
    for (name, value) in query {
        serializer.append_pair(name.as_ref(), value.as_ref());
    }
    format!("{}?{}", base, serializer.finish())
}
