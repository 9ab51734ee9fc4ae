//! Query parameter serialization and URL combination.
//!
//! Turns the `params` map of a request config into a query string and
//! splices it onto the request URL, and resolves relative URLs against
//! the configured base URL.
//!
//! The encoding is deliberately looser than strict RFC 3986 component
//! encoding: `@`, `:`, `$`, `,`, `[`, and `]` stay literal and spaces
//! become `+`, which is what servers expecting conventional query
//! strings (and bracketed array keys like `ids[]=1&ids[]=2`) parse.

use serde_json::{Map, Value};

use crate::config::ParamsSerializer;

/// Percent-encode a query component, keeping the conventional set of
/// literals and mapping spaces to `+`.
fn encode(input: &str) -> String {
    const KEEP: &[u8] = b"-_.!~*'()@:$,[]";
    let mut out = String::with_capacity(input.len());
    for &b in input.as_bytes() {
        match b {
            b' ' => out.push('+'),
            b if b.is_ascii_alphanumeric() || KEEP.contains(&b) => out.push(b as char),
            b => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

/// Render a single parameter value.
///
/// Strings are used verbatim, numbers and booleans via their display
/// form, and nested objects or arrays as compact JSON.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_owned(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Object(_) | Value::Array(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

/// Serialize a params map into `key=value&...` form.
///
/// Top-level `null` entries are skipped. Array values expand to one
/// `key[]=element` pair per element, in order.
pub(crate) fn serialize_params(params: &Map<String, Value>) -> String {
    let mut parts = Vec::new();
    for (key, value) in params {
        match value {
            Value::Null => continue,
            Value::Array(items) => {
                let key = format!("{key}[]");
                for item in items {
                    parts.push(format!("{}={}", encode(&key), encode(&render(item))));
                }
            }
            other => parts.push(format!("{}={}", encode(key), encode(&render(other)))),
        }
    }
    parts.join("&")
}

/// Append serialized params to a URL.
///
/// Uses the custom serializer when one is configured. A non-empty query
/// drops any `#fragment` from the URL and joins with `?` or `&`
/// depending on whether the URL already carries a query.
pub(crate) fn append_params(
    url: &str,
    params: Option<&Map<String, Value>>,
    serializer: Option<&ParamsSerializer>,
) -> String {
    let Some(params) = params else {
        return url.to_owned();
    };
    let serialized = match serializer {
        Some(f) => f(params),
        None => serialize_params(params),
    };
    if serialized.is_empty() {
        return url.to_owned();
    }
    let url = match url.find('#') {
        Some(i) => &url[..i],
        None => url,
    };
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{url}{sep}{serialized}")
}

/// Whether a target names any scheme at all (`https://h`, `mailto:a`),
/// as opposed to a bare host or path.
pub(crate) fn has_scheme(url: &str) -> bool {
    let Some(idx) = url.find(':') else {
        return false;
    };
    let scheme = &url[..idx];
    let mut chars = scheme.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Whether a URL is absolute: scheme-prefixed (`https://...`) or
/// protocol-relative (`//host/...`).
pub(crate) fn is_absolute_url(url: &str) -> bool {
    if url.starts_with("//") {
        return true;
    }
    let Some(idx) = url.find("://") else {
        return false;
    };
    let scheme = &url[..idx];
    let mut chars = scheme.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Join a base URL and a relative URL with exactly one slash between
/// them.
pub(crate) fn combine_urls(base: &str, relative: &str) -> String {
    if relative.is_empty() {
        return base.to_owned();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        relative.trim_start_matches('/')
    )
}

/// Resolve the effective request URL: relative URLs combine with the
/// base URL, absolute URLs win over it.
pub(crate) fn full_path(base: Option<&str>, url: &str) -> String {
    match base {
        Some(base) if !is_absolute_url(url) => combine_urls(base, url),
        _ => url.to_owned(),
    }
}
