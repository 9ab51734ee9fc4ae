//! Request configuration and config merging.
//!
//! [`RequestConfig`] is the declarative description of a request: URL,
//! method, headers, body, transforms, limits, and transport overrides.
//! A [`Client`](crate::Client) holds one as its defaults;
//! [`merge_config()`] folds a per-request config over those defaults
//! before dispatch.
//!
//! Merging is not uniform across fields. `url`, `method`, and `data`
//! describe one concrete request and are never inherited from defaults;
//! `headers` and `params` merge key-by-key with the per-request side
//! winning; everything else takes the per-request value when present
//! and falls back to the default otherwise.

use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::adapter::Adapter;
use crate::body::Body;
use crate::cancel::CancelToken;
use crate::proxy::ProxySetting;
use crate::response::ResponseData;
use crate::transform;
use crate::transport::{AgentHandle, Transport};

/// Predicate deciding which response status codes settle successfully.
pub type StatusValidator = Arc<dyn Fn(StatusCode) -> bool + Send + Sync>;

/// Request transform: maps the outgoing body, with mutable access to
/// the config headers (e.g. to set `Content-Type`).
pub type RequestTransform =
    Arc<dyn Fn(Option<Body>, &mut ConfigHeaders) -> crate::Result<Option<Body>> + Send + Sync>;

/// Response transform: maps the buffered response data, with read
/// access to the response headers.
pub type ResponseTransform =
    Arc<dyn Fn(ResponseData, &HeaderMap) -> crate::Result<ResponseData> + Send + Sync>;

/// Custom query-string serializer, replacing the built-in one.
pub type ParamsSerializer = Arc<dyn Fn(&Map<String, Value>) -> String + Send + Sync>;

/// Callback invoked with download progress as response chunks arrive.
pub type ProgressHandler = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// A progress snapshot handed to a [`ProgressHandler`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Bytes transferred so far.
    pub loaded: u64,
    /// Total bytes expected, when the peer declared `Content-Length`.
    pub total: Option<u64>,
}

/// HTTP Basic credentials.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Auth {
    /// Username (sent verbatim, not percent-encoded).
    pub username: String,
    /// Password.
    pub password: String,
}

impl Auth {
    /// Create credentials from username and password.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// How the response body is delivered on the settled [`Response`](crate::Response).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResponseType {
    /// Buffer and decode as text; the default response transform then
    /// parses it as JSON when it looks like JSON.
    #[default]
    Json,
    /// Buffer and decode as text, same as `Json` at the adapter level.
    Text,
    /// Buffer the raw bytes without charset decoding.
    Bytes,
    /// Hand the body over as a stream without buffering; transforms and
    /// the content-length ceiling do not apply.
    Stream,
}

/// Layered request headers.
///
/// Headers live in three groups: `common` (applied to every request),
/// one scoped group per method (applied only to requests of that
/// method), and `direct` headers set for a specific request. At
/// dispatch the groups are flattened into a single [`HeaderMap`] with
/// precedence `direct` over `scoped` over `common`.
#[derive(Clone, Debug, Default)]
pub struct ConfigHeaders {
    common: HeaderMap,
    scoped: HashMap<Method, HeaderMap>,
    direct: HeaderMap,
}

/// Copy `src` entries over `dst`, replacing existing values of the same
/// name while preserving multi-value runs within `src`.
pub(crate) fn overlay(dst: &mut HeaderMap, src: &HeaderMap) {
    let mut prev: Option<HeaderName> = None;
    for (name, value) in src.iter() {
        if prev.as_ref() == Some(name) {
            dst.append(name.clone(), value.clone());
        } else {
            dst.insert(name.clone(), value.clone());
            prev = Some(name.clone());
        }
    }
}

impl ConfigHeaders {
    /// Create an empty header set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a header for this specific request (highest precedence).
    pub fn insert(&mut self, name: HeaderName, value: HeaderValue) {
        self.direct.insert(name, value);
    }

    /// Look up a header among the direct (per-request) entries.
    pub fn get(&self, name: &HeaderName) -> Option<&HeaderValue> {
        self.direct.get(name)
    }

    /// Headers applied to every request.
    pub fn common(&self) -> &HeaderMap {
        &self.common
    }

    /// Mutable access to the headers applied to every request.
    pub fn common_mut(&mut self) -> &mut HeaderMap {
        &mut self.common
    }

    /// Headers applied only to requests of `method`, if any are set.
    pub fn scoped(&self, method: &Method) -> Option<&HeaderMap> {
        self.scoped.get(method)
    }

    /// Mutable access to the headers for requests of `method`.
    pub fn scoped_mut(&mut self, method: Method) -> &mut HeaderMap {
        self.scoped.entry(method).or_default()
    }

    /// Per-request headers.
    pub fn direct(&self) -> &HeaderMap {
        &self.direct
    }

    /// Mutable access to the per-request headers.
    pub fn direct_mut(&mut self) -> &mut HeaderMap {
        &mut self.direct
    }

    /// Flatten the groups into the header map sent on the wire.
    ///
    /// Precedence: direct over the `method` scope over common. Scoped
    /// groups for other methods are ignored.
    pub fn flatten(&self, method: &Method) -> HeaderMap {
        let mut out = self.common.clone();
        if let Some(scoped) = self.scoped.get(method) {
            overlay(&mut out, scoped);
        }
        overlay(&mut out, &self.direct);
        out
    }

    /// Rebuild from an already-flattened map; everything lands in the
    /// direct group. Dispatch uses this after flattening so adapters
    /// and interceptors observe exactly the wire headers.
    pub(crate) fn from_flat(map: HeaderMap) -> Self {
        Self {
            common: HeaderMap::new(),
            scoped: HashMap::new(),
            direct: map,
        }
    }

    /// Merge two header sets group by group, `over` winning per name.
    pub(crate) fn merge(base: &Self, over: &Self) -> Self {
        let mut out = base.clone();
        overlay(&mut out.common, &over.common);
        for (method, map) in &over.scoped {
            overlay(out.scoped.entry(method.clone()).or_default(), map);
        }
        overlay(&mut out.direct, &over.direct);
        out
    }
}

/// Declarative description of a request.
///
/// Every field is optional; unset fields fall back to the client
/// defaults during [`merge_config()`] and to built-in behavior after
/// that. See the module docs for which fields merge and which are
/// per-request only.
#[derive(Default)]
pub struct RequestConfig {
    /// Request URL, absolute or relative to [`base_url`](Self::base_url).
    pub url: Option<String>,
    /// HTTP method; `GET` when unset.
    pub method: Option<Method>,
    /// Base URL that relative request URLs are joined onto.
    pub base_url: Option<String>,
    /// Layered request headers.
    pub headers: ConfigHeaders,
    /// Query parameters, serialized onto the URL at dispatch.
    pub params: Option<Map<String, Value>>,
    /// Custom query-string serializer.
    pub params_serializer: Option<ParamsSerializer>,
    /// Request body.
    pub data: Option<Body>,
    /// Deadline for the whole exchange. `None` (and `Duration::ZERO`)
    /// mean no deadline.
    pub timeout: Option<Duration>,
    /// Whether cross-site requests should carry credentials. Carried
    /// for adapters that implement a cookie-capable environment.
    pub with_credentials: Option<bool>,
    /// Adapter override for this request.
    pub adapter: Option<Arc<dyn Adapter>>,
    /// HTTP Basic credentials; overrides any userinfo in the URL.
    pub auth: Option<Auth>,
    /// How the response body is delivered.
    pub response_type: Option<ResponseType>,
    /// Charset for decoding text responses (`utf-8` when unset).
    pub response_encoding: Option<String>,
    /// Cookie name to read an XSRF token from. Carried for
    /// cookie-capable adapters.
    pub xsrf_cookie_name: Option<String>,
    /// Header name to send an XSRF token in. Carried for cookie-capable
    /// adapters.
    pub xsrf_header_name: Option<String>,
    /// Upload progress callback. Carried for adapters that track
    /// request body transmission.
    pub on_upload_progress: Option<ProgressHandler>,
    /// Download progress callback, fired per buffered response chunk.
    pub on_download_progress: Option<ProgressHandler>,
    /// Ceiling on the buffered response body size, in bytes.
    pub max_content_length: Option<u64>,
    /// Ceiling on the request body size, enforced by transports.
    pub max_body_length: Option<u64>,
    /// Redirect budget: `Some(0)` disables following entirely.
    pub max_redirects: Option<usize>,
    /// Unix domain socket path, used instead of TCP when set.
    pub socket_path: Option<String>,
    /// Connection pool handle for plain-HTTP origins, passed through to
    /// the transport.
    pub http_agent: Option<AgentHandle>,
    /// Connection pool handle for HTTPS origins, passed through to the
    /// transport.
    pub https_agent: Option<AgentHandle>,
    /// Proxy selection; `None` consults `*_proxy` environment variables.
    pub proxy: Option<ProxySetting>,
    /// Cancellation token observed before, during, and after the
    /// exchange.
    pub cancel_token: Option<CancelToken>,
    /// Whether compressed response bodies are transparently inflated.
    /// Defaults to on.
    pub decompress: Option<bool>,
    /// Predicate deciding which status codes settle successfully.
    /// `None` accepts every status.
    pub validate_status: Option<StatusValidator>,
    /// Request transform pipeline, applied to the body before dispatch.
    pub transform_request: Option<Vec<RequestTransform>>,
    /// Response transform pipeline, applied to buffered response data.
    pub transform_response: Option<Vec<ResponseTransform>>,
    /// Transport override for this request.
    pub transport: Option<Arc<dyn Transport>>,
}

impl RequestConfig {
    /// The built-in defaults a fresh [`Client`](crate::Client) starts
    /// from.
    ///
    /// Installs the JSON request/response transforms, a 2xx status
    /// validator, an `Accept` header, a form-urlencoded `Content-Type`
    /// for `POST`/`PUT`/`PATCH`, and the conventional XSRF field names.
    pub fn with_defaults() -> Self {
        let mut headers = ConfigHeaders::new();
        headers.common_mut().insert(
            http::header::ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );
        for method in [Method::POST, Method::PUT, Method::PATCH] {
            headers.scoped_mut(method).insert(
                http::header::CONTENT_TYPE,
                HeaderValue::from_static("application/x-www-form-urlencoded"),
            );
        }

        Self {
            headers,
            xsrf_cookie_name: Some("XSRF-TOKEN".to_owned()),
            xsrf_header_name: Some("X-XSRF-TOKEN".to_owned()),
            validate_status: Some(Arc::new(|status: StatusCode| {
                status.as_u16() >= 200 && status.as_u16() < 300
            })),
            transform_request: Some(vec![transform::default_transform_request()]),
            transform_response: Some(vec![transform::default_transform_response()]),
            ..Self::default()
        }
    }

    /// Clone this config with the body left out.
    ///
    /// Streaming bodies cannot be cloned; dispatch moves the body into
    /// the transport before any echo of the config is taken, so the
    /// copies attached to responses and errors are body-less.
    pub fn clone_without_data(&self) -> Self {
        Self {
            url: self.url.clone(),
            method: self.method.clone(),
            base_url: self.base_url.clone(),
            headers: self.headers.clone(),
            params: self.params.clone(),
            params_serializer: self.params_serializer.clone(),
            data: None,
            timeout: self.timeout,
            with_credentials: self.with_credentials,
            adapter: self.adapter.clone(),
            auth: self.auth.clone(),
            response_type: self.response_type,
            response_encoding: self.response_encoding.clone(),
            xsrf_cookie_name: self.xsrf_cookie_name.clone(),
            xsrf_header_name: self.xsrf_header_name.clone(),
            on_upload_progress: self.on_upload_progress.clone(),
            on_download_progress: self.on_download_progress.clone(),
            max_content_length: self.max_content_length,
            max_body_length: self.max_body_length,
            max_redirects: self.max_redirects,
            socket_path: self.socket_path.clone(),
            http_agent: self.http_agent.clone(),
            https_agent: self.https_agent.clone(),
            proxy: self.proxy.clone(),
            cancel_token: self.cancel_token.clone(),
            decompress: self.decompress,
            validate_status: self.validate_status.clone(),
            transform_request: self.transform_request.clone(),
            transform_response: self.transform_response.clone(),
            transport: self.transport.clone(),
        }
    }
}

impl fmt::Debug for RequestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestConfig")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("base_url", &self.base_url)
            .field("headers", &self.headers)
            .field("params", &self.params)
            .field("data", &self.data)
            .field("timeout", &self.timeout)
            .field("auth", &self.auth.as_ref().map(|a| a.username.as_str()))
            .field("proxy", &self.proxy)
            .field("response_type", &self.response_type)
            .field("max_content_length", &self.max_content_length)
            .field("max_redirects", &self.max_redirects)
            .field("cancel_token", &self.cancel_token)
            .field("validate_status", &self.validate_status.is_some())
            .field(
                "transform_request",
                &self.transform_request.as_ref().map(Vec::len),
            )
            .field(
                "transform_response",
                &self.transform_response.as_ref().map(Vec::len),
            )
            .field("transport", &self.transport.is_some())
            .field("adapter", &self.adapter.is_some())
            .finish_non_exhaustive()
    }
}

/// Recursively fold `src` into `dst`; nested objects merge key-by-key,
/// everything else (arrays included) replaces.
fn deep_extend(dst: &mut Map<String, Value>, src: Map<String, Value>) {
    for (key, value) in src {
        if let Value::Object(incoming) = value {
            if let Some(Value::Object(existing)) = dst.get_mut(&key) {
                deep_extend(existing, incoming);
                continue;
            }
            dst.insert(key, Value::Object(incoming));
        } else {
            dst.insert(key, value);
        }
    }
}

fn merge_params(
    base: Option<&Map<String, Value>>,
    over: Option<Map<String, Value>>,
) -> Option<Map<String, Value>> {
    match (base, over) {
        (None, None) => None,
        (Some(b), None) => Some(b.clone()),
        (None, Some(o)) => Some(o),
        (Some(b), Some(o)) => {
            let mut out = b.clone();
            deep_extend(&mut out, o);
            Some(out)
        }
    }
}

/// Merge a per-request config over a defaults config.
///
/// Three tiers of fields:
///
/// - `url`, `method`, `data` come from the per-request side only;
///   defaults never supply them.
/// - `headers` and `params` merge key-by-key (per-request wins);
///   `auth` and `proxy` are replaced wholesale when the per-request
///   side sets them.
/// - Every other field takes the per-request value when present and the
///   default otherwise. Transform lists are replaced, never
///   concatenated.
pub fn merge_config(base: &RequestConfig, overrides: Option<RequestConfig>) -> RequestConfig {
    let over = overrides.unwrap_or_default();
    RequestConfig {
        // Per-request only.
        url: over.url,
        method: over.method,
        data: over.data,
        // Deep-merged.
        headers: ConfigHeaders::merge(&base.headers, &over.headers),
        params: merge_params(base.params.as_ref(), over.params),
        auth: over.auth.or_else(|| base.auth.clone()),
        proxy: over.proxy.or_else(|| base.proxy.clone()),
        // Per-request value wins, defaults fill the gaps.
        base_url: over.base_url.or_else(|| base.base_url.clone()),
        params_serializer: over
            .params_serializer
            .or_else(|| base.params_serializer.clone()),
        timeout: over.timeout.or(base.timeout),
        with_credentials: over.with_credentials.or(base.with_credentials),
        adapter: over.adapter.or_else(|| base.adapter.clone()),
        response_type: over.response_type.or(base.response_type),
        response_encoding: over
            .response_encoding
            .or_else(|| base.response_encoding.clone()),
        xsrf_cookie_name: over
            .xsrf_cookie_name
            .or_else(|| base.xsrf_cookie_name.clone()),
        xsrf_header_name: over
            .xsrf_header_name
            .or_else(|| base.xsrf_header_name.clone()),
        on_upload_progress: over
            .on_upload_progress
            .or_else(|| base.on_upload_progress.clone()),
        on_download_progress: over
            .on_download_progress
            .or_else(|| base.on_download_progress.clone()),
        max_content_length: over.max_content_length.or(base.max_content_length),
        max_body_length: over.max_body_length.or(base.max_body_length),
        max_redirects: over.max_redirects.or(base.max_redirects),
        socket_path: over.socket_path.or_else(|| base.socket_path.clone()),
        http_agent: over.http_agent.or_else(|| base.http_agent.clone()),
        https_agent: over.https_agent.or_else(|| base.https_agent.clone()),
        cancel_token: over.cancel_token.or_else(|| base.cancel_token.clone()),
        decompress: over.decompress.or(base.decompress),
        validate_status: over.validate_status.or_else(|| base.validate_status.clone()),
        transform_request: over
            .transform_request
            .or_else(|| base.transform_request.clone()),
        transform_response: over
            .transform_response
            .or_else(|| base.transform_response.clone()),
        transport: over.transport.or_else(|| base.transport.clone()),
    }
}
