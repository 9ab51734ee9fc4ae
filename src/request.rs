//! Request builder.
//!
//! [`RequestBuilder`] is the fluent front door over a per-request
//! [`RequestConfig`]: obtain one from a client verb method
//! ([`Client::get()`](crate::Client::get),
//! [`Client::post()`](crate::Client::post), ...), chain setters, then
//! [`send()`](RequestBuilder::send). Anything the builder cannot
//! express is available by passing a full config to
//! [`Client::request()`](crate::Client::request).

use http::{HeaderMap, HeaderName, HeaderValue, Method};
use std::time::Duration;

use crate::body::Body;
use crate::cancel::CancelToken;
use crate::client::Client;
use crate::config::{Auth, RequestConfig, ResponseType, overlay};
use crate::error::Error;
use crate::response::Response;

// The future returned by `RequestBuilder::send()` must be Send so callers
// can use it in multi-threaded executors (e.g., tokio). This compile-time
// assertion catches regressions -- if any value held across an await point
// is not Send, this fails to compile.
fn _assert_send_future(rb: RequestBuilder) {
    fn require_send<T: Send>(_t: &T) {}
    let fut = rb.send();
    require_send(&fut);
}

/// A builder for one HTTP request.
///
/// Setters that can fail (serialization, header parsing) defer their
/// error: the builder stays chainable and the first error surfaces from
/// [`build()`](Self::build) or [`send()`](Self::send).
pub struct RequestBuilder {
    client: Client,
    config: Result<RequestConfig, Error>,
}

impl std::fmt::Debug for RequestBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut dbg = f.debug_struct("RequestBuilder");
        match &self.config {
            Ok(config) => dbg
                .field("method", &config.method)
                .field("url", &config.url),
            Err(_) => dbg.field("config", &"<invalid>"),
        }
        .finish()
    }
}

impl RequestBuilder {
    pub(crate) fn new(client: Client, method: Method, url: impl Into<String>) -> Self {
        Self {
            client,
            config: Ok(RequestConfig {
                method: Some(method),
                url: Some(url.into()),
                ..RequestConfig::default()
            }),
        }
    }

    /// Record a deferred error, keeping the first one.
    fn defer_error(&mut self, err: Error) {
        if self.config.is_ok() {
            self.config = Err(err);
        }
    }

    /// Set a header on this request.
    ///
    /// Repeated calls with the same name replace the value. Invalid
    /// header names or values are deferred to [`send()`](Self::send)
    /// as errors.
    #[must_use]
    pub fn header<K, V>(mut self, key: K, value: V) -> Self
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        let name = match HeaderName::try_from(key) {
            Ok(n) => n,
            Err(e) => {
                self.defer_error(Error::builder("invalid header name").with_source(e.into()));
                return self;
            }
        };
        let value = match HeaderValue::try_from(value) {
            Ok(v) => v,
            Err(e) => {
                self.defer_error(Error::builder("invalid header value").with_source(e.into()));
                return self;
            }
        };
        if let Ok(config) = &mut self.config {
            config.headers.insert(name, value);
        }
        self
    }

    /// Merge a header map into this request.
    ///
    /// Entries replace same-named headers already on the request;
    /// multi-value runs within `headers` are preserved.
    #[must_use]
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        if let Ok(config) = &mut self.config {
            overlay(config.headers.direct_mut(), &headers);
        }
        self
    }

    /// Set a JSON body.
    ///
    /// The value is carried structured and serialized by the request
    /// transform at dispatch, which also tags the `Content-Type` unless
    /// one is already set.
    #[must_use]
    pub fn json<T: serde::Serialize + ?Sized>(mut self, body: &T) -> Self {
        match serde_json::to_value(body) {
            Ok(value) => {
                if let Ok(config) = &mut self.config {
                    config.data = Some(Body::json(value));
                }
            }
            Err(e) => {
                self.defer_error(Error::builder("JSON body serialization failed").with_source(e));
            }
        }
        self
    }

    /// Set a raw body.
    ///
    /// Accepts anything convertible into a [`Body`]: `String`, `&str`,
    /// `Vec<u8>`, `Bytes`, or a stream via [`Body::wrap_stream()`].
    #[must_use]
    pub fn body<B: Into<Body>>(mut self, body: B) -> Self {
        if let Ok(config) = &mut self.config {
            config.data = Some(body.into());
        }
        self
    }

    /// Merge query parameters into this request.
    ///
    /// `params` must serialize to an object; its keys merge over any
    /// params set earlier. Serialization onto the URL happens at
    /// dispatch, after the config-level params merge.
    #[must_use]
    pub fn params<T: serde::Serialize + ?Sized>(mut self, params: &T) -> Self {
        match serde_json::to_value(params) {
            Ok(serde_json::Value::Object(map)) => {
                if let Ok(config) = &mut self.config {
                    match &mut config.params {
                        Some(existing) => existing.extend(map),
                        None => config.params = Some(map),
                    }
                }
            }
            Ok(_) => {
                self.defer_error(Error::builder("query params must serialize to an object"));
            }
            Err(e) => {
                self.defer_error(Error::builder("query param serialization failed").with_source(e));
            }
        }
        self
    }

    /// Set HTTP Basic credentials.
    ///
    /// Overrides any userinfo embedded in the URL.
    #[must_use]
    pub fn auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        if let Ok(config) = &mut self.config {
            config.auth = Some(Auth::new(username, password));
        }
        self
    }

    /// Set a deadline for the whole exchange.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        if let Ok(config) = &mut self.config {
            config.timeout = Some(timeout);
        }
        self
    }

    /// Choose how the response body is delivered.
    #[must_use]
    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        if let Ok(config) = &mut self.config {
            config.response_type = Some(response_type);
        }
        self
    }

    /// Attach a cancellation token.
    #[must_use]
    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        if let Ok(config) = &mut self.config {
            config.cancel_token = Some(token);
        }
        self
    }

    /// Finish the builder, returning the per-request config it
    /// accumulated (or the first deferred error).
    ///
    /// The config has not been merged with the client defaults yet;
    /// that happens inside [`Client::request()`](Client::request).
    pub fn build(self) -> crate::Result<RequestConfig> {
        self.config
    }

    /// Try to clone this builder.
    ///
    /// Returns `None` if the builder is in an error state or carries a
    /// streaming body, which cannot be replayed.
    pub fn try_clone(&self) -> Option<RequestBuilder> {
        let config = match &self.config {
            Ok(c) => c,
            Err(_) => return None,
        };
        let data = match &config.data {
            Some(body) => Some(body.try_clone()?),
            None => None,
        };
        let mut copy = config.clone_without_data();
        copy.data = data;
        Some(RequestBuilder {
            client: self.client.clone(),
            config: Ok(copy),
        })
    }

    /// Send the request through the client's pipeline and await the
    /// settled response.
    pub async fn send(self) -> crate::Result<Response> {
        let RequestBuilder { client, config } = self;
        client.request(config?).await
    }
}
