//! HTTP client and builder.
//!
//! [`Client`] is the main entry point. Create one via [`Client::builder()`],
//! give it a transport (or a whole adapter), configure defaults, then call
//! [`.build()`](ClientBuilder::build). `Client` is cheap to clone (`Arc`
//! internally); clones share defaults, adapter, and interceptor registries.

use std::sync::{Arc, Mutex, MutexGuard};

use http::Method;

use crate::adapter::{Adapter, HttpAdapter};
use crate::config::{RequestConfig, merge_config};
use crate::dispatch::dispatch;
use crate::error::Error;
use crate::interceptor::InterceptorManager;
use crate::params;
use crate::request::RequestBuilder;
use crate::response::Response;
use crate::transport::Transport;
use crate::util::lock_or_clear;

/// An async HTTP client: defaults, interceptors, and an adapter.
///
/// `Client` is cheap to [`Clone`] -- clones share the defaults, the
/// adapter, and the interceptor registries. For an instance with its
/// own interceptors, use [`create()`](Self::create) instead.
///
/// # Example
///
/// ```rust,ignore
/// let client = Client::builder()
///     .transport(my_transport)
///     .base_url("https://api.example.com")
///     .timeout(Duration::from_secs(30))
///     .build()?;
///
/// let user: User = client.get("/users/4").send().await?.json()?;
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").finish()
    }
}

/// Shared state behind `Arc` in [`Client`].
struct ClientInner {
    /// Merged defaults every request starts from.
    defaults: RequestConfig,
    /// Adapter used when a request does not carry its own.
    adapter: Arc<dyn Adapter>,
    /// Handlers folded over the config before dispatch.
    request_interceptors: Mutex<InterceptorManager<RequestConfig>>,
    /// Handlers folded over the outcome after dispatch.
    response_interceptors: Mutex<InterceptorManager<Response>>,
}

/// Builder for configuring and constructing a [`Client`].
///
/// Obtain via [`Client::builder()`]. Setter errors are deferred: the
/// first one is stored and surfaced by [`build()`](Self::build).
pub struct ClientBuilder {
    defaults: RequestConfig,
    adapter: Option<Arc<dyn Adapter>>,
    error: Option<Error>,
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("defaults", &self.defaults)
            .field("has_adapter", &self.adapter.is_some())
            .field("error", &self.error)
            .finish()
    }
}

impl Client {
    /// Create a client over the given transport with the built-in
    /// defaults.
    ///
    /// Shorthand for `Client::builder().transport(transport).build()`,
    /// which cannot fail when a transport is supplied.
    pub fn new(transport: impl Transport + 'static) -> Self {
        Client::builder()
            .transport(transport)
            .build()
            .expect("building a client from a bare transport cannot fail")
    }

    /// Create a new [`ClientBuilder`].
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Start a GET request to the given URL.
    pub fn get(&self, url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(self.clone(), Method::GET, url)
    }

    /// Start a POST request to the given URL.
    pub fn post(&self, url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(self.clone(), Method::POST, url)
    }

    /// Start a PUT request to the given URL.
    pub fn put(&self, url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(self.clone(), Method::PUT, url)
    }

    /// Start a PATCH request to the given URL.
    pub fn patch(&self, url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(self.clone(), Method::PATCH, url)
    }

    /// Start a DELETE request to the given URL.
    pub fn delete(&self, url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(self.clone(), Method::DELETE, url)
    }

    /// Start a HEAD request to the given URL.
    pub fn head(&self, url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(self.clone(), Method::HEAD, url)
    }

    /// Start an OPTIONS request to the given URL.
    pub fn options(&self, url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(self.clone(), Method::OPTIONS, url)
    }

    /// Execute a request described by a [`RequestConfig`].
    ///
    /// This is the lower-level counterpart of
    /// [`RequestBuilder::send()`](crate::RequestBuilder::send): the
    /// config is merged over the client defaults, run through the
    /// request interceptors (latest registered first), dispatched, and
    /// the outcome run through the response interceptors (registration
    /// order).
    pub async fn request(&self, config: RequestConfig) -> crate::Result<Response> {
        let mut merged = merge_config(&self.inner.defaults, Some(config));

        // The verb falls back to the client defaults even though merge
        // never copies it over; interceptors observe the resolved verb.
        let method = merged
            .method
            .take()
            .or_else(|| self.inner.defaults.method.clone())
            .unwrap_or(Method::GET);
        merged.method = Some(method);

        self.run_pipeline(merged).await
    }

    /// Fold the interceptor chains around the dispatch core.
    ///
    /// Each stage is a `(fulfilled, rejected)` pair: `fulfilled` runs
    /// when the carried value is a success, `rejected` when it is an
    /// error -- and a `rejected` handler that returns `Ok` converts the
    /// failure back into a success. The registries are snapshotted up
    /// front, so handlers registered mid-flight only affect later
    /// requests.
    async fn run_pipeline(&self, config: RequestConfig) -> crate::Result<Response> {
        let request_chain = lock_or_clear(&self.inner.request_interceptors).snapshot_live();
        let response_chain = lock_or_clear(&self.inner.response_interceptors).snapshot_live();

        trace!(
            request_handlers = request_chain.len(),
            response_handlers = response_chain.len(),
            "running pipeline",
        );

        let mut staged = Ok(config);
        for (fulfilled, rejected) in request_chain.iter().rev() {
            staged = match staged {
                Ok(config) => fulfilled(config),
                Err(err) => match rejected {
                    Some(recover) => recover(err),
                    None => Err(err),
                },
            };
        }

        let mut outcome = match staged {
            Ok(config) => dispatch(self.inner.adapter.clone(), config).await,
            Err(err) => Err(err),
        };

        for (fulfilled, rejected) in &response_chain {
            outcome = match outcome {
                Ok(response) => fulfilled(response),
                Err(err) => match rejected {
                    Some(recover) => recover(err),
                    None => Err(err),
                },
            };
        }
        outcome
    }

    /// Render the URL a config would be sent to, query included.
    ///
    /// The config is merged over the client defaults and the params are
    /// serialized onto the URL without dispatching anything. A config
    /// with no URL yields the bare query string.
    pub fn get_uri(&self, config: RequestConfig) -> String {
        let merged = merge_config(&self.inner.defaults, Some(config));
        let url = merged.url.as_deref().unwrap_or("");
        let mut uri = params::append_params(
            url,
            merged.params.as_ref(),
            merged.params_serializer.as_ref(),
        );
        if uri.starts_with('?') {
            uri.remove(0);
        }
        uri
    }

    /// Derive an independent client.
    ///
    /// The given defaults are merged over this client's, the adapter is
    /// shared, and the interceptor registries start empty -- the two
    /// clients share no mutable state.
    pub fn create(&self, defaults: RequestConfig) -> Client {
        Client {
            inner: Arc::new(ClientInner {
                defaults: merge_config(&self.inner.defaults, Some(defaults)),
                adapter: self.inner.adapter.clone(),
                request_interceptors: Mutex::new(InterceptorManager::new()),
                response_interceptors: Mutex::new(InterceptorManager::new()),
            }),
        }
    }

    /// Access the request interceptor registry.
    ///
    /// The guard holds the registry lock; register or eject and drop
    /// it. Requests snapshot the registry when they start, so changes
    /// never affect a request already in flight.
    pub fn request_interceptors(&self) -> MutexGuard<'_, InterceptorManager<RequestConfig>> {
        lock_or_clear(&self.inner.request_interceptors)
    }

    /// Access the response interceptor registry.
    ///
    /// Same locking contract as
    /// [`request_interceptors()`](Self::request_interceptors).
    pub fn response_interceptors(&self) -> MutexGuard<'_, InterceptorManager<Response>> {
        lock_or_clear(&self.inner.response_interceptors)
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientBuilder {
    /// Create a new `ClientBuilder` seeded with the built-in defaults.
    pub fn new() -> Self {
        Self {
            defaults: RequestConfig::with_defaults(),
            adapter: None,
            error: None,
        }
    }

    /// Record a deferred error, keeping the first one.
    fn defer_error(&mut self, err: Error) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    /// Set the transport requests go out on.
    ///
    /// The transport is wrapped in the standard [`HttpAdapter`]; use
    /// [`adapter()`](Self::adapter) to replace the adapter wholesale.
    #[must_use]
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.adapter = Some(Arc::new(HttpAdapter::new(Arc::new(transport))));
        self
    }

    /// Set the adapter requests are handed to.
    ///
    /// Replaces the whole exchange stage, including the request
    /// construction [`HttpAdapter`] performs. Most callers want
    /// [`transport()`](Self::transport).
    #[must_use]
    pub fn adapter(mut self, adapter: impl Adapter + 'static) -> Self {
        self.adapter = Some(Arc::new(adapter));
        self
    }

    /// Merge instance defaults over the built-in ones.
    #[must_use]
    pub fn defaults(mut self, defaults: RequestConfig) -> Self {
        self.defaults = merge_config(&self.defaults, Some(defaults));
        self
    }

    /// Set the base URL relative request URLs are joined onto.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.defaults.base_url = Some(url.into());
        self
    }

    /// Set the default deadline for the whole exchange.
    ///
    /// Individual requests may override it;
    /// [`Duration::ZERO`](std::time::Duration::ZERO) disables the
    /// deadline again.
    #[must_use]
    pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
        self.defaults.timeout = Some(timeout);
        self
    }

    /// Add a header sent with every request, any method.
    ///
    /// Stored in the common defaults group: request headers and
    /// method-scoped defaults both win over it. Invalid names or values
    /// are deferred to [`build()`](Self::build) as errors.
    #[must_use]
    pub fn default_header<K, V>(mut self, key: K, value: V) -> Self
    where
        http::header::HeaderName: TryFrom<K>,
        <http::header::HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        http::HeaderValue: TryFrom<V>,
        <http::HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        let name = match http::header::HeaderName::try_from(key) {
            Ok(n) => n,
            Err(e) => {
                self.defer_error(
                    Error::builder("invalid default header name").with_source(e.into()),
                );
                return self;
            }
        };
        let value = match http::HeaderValue::try_from(value) {
            Ok(v) => v,
            Err(e) => {
                self.defer_error(
                    Error::builder("invalid default header value").with_source(e.into()),
                );
                return self;
            }
        };
        self.defaults.headers.common_mut().insert(name, value);
        self
    }

    /// Build the [`Client`].
    ///
    /// Fails with the first deferred setter error, or with a builder
    /// error when neither a transport nor an adapter was supplied.
    pub fn build(self) -> crate::Result<Client> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let Some(adapter) = self.adapter else {
            return Err(Error::builder("client requires a transport or adapter"));
        };

        debug!(
            base_url = self.defaults.base_url.as_deref(),
            timeout_ms = self.defaults.timeout.map(|d| d.as_millis() as u64),
            "client built",
        );

        Ok(Client {
            inner: Arc::new(ClientInner {
                defaults: self.defaults,
                adapter,
                request_interceptors: Mutex::new(InterceptorManager::new()),
                response_interceptors: Mutex::new(InterceptorManager::new()),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::ResponseData;
    use crate::transport::{BoxFuture, TransportRequest};
    use futures_executor::block_on;
    use http::header::{ACCEPT, CONTENT_TYPE, HeaderName};
    use http::{HeaderMap, StatusCode};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn wire_request() -> TransportRequest {
        TransportRequest {
            method: Method::GET,
            secure: false,
            hostname: "api.test".into(),
            port: 80,
            path: "/".into(),
            headers: HeaderMap::new(),
            basic_auth: None,
            redirect: crate::redirect::Policy::default(),
            max_body_length: None,
            socket_path: None,
            http_agent: None,
            https_agent: None,
            body: None,
        }
    }

    fn respond_with(config: &RequestConfig, data: ResponseData) -> Response {
        Response {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            data,
            config: config.clone_without_data(),
            request: wire_request(),
            url: None,
        }
    }

    /// Adapter that runs a closure and counts invocations.
    struct FnAdapter {
        calls: Arc<AtomicUsize>,
        respond: Arc<dyn Fn(RequestConfig) -> crate::Result<Response> + Send + Sync>,
    }

    impl FnAdapter {
        fn new(
            respond: impl Fn(RequestConfig) -> crate::Result<Response> + Send + Sync + 'static,
        ) -> Self {
            Self {
                calls: Arc::new(AtomicUsize::new(0)),
                respond: Arc::new(respond),
            }
        }

        fn ok() -> Self {
            Self::new(|config| Ok(respond_with(&config, ResponseData::default())))
        }

        /// Adapter that stashes a body-less copy of every config it sees.
        fn capturing(captured: Arc<Mutex<Option<RequestConfig>>>) -> Self {
            Self::new(move |config| {
                *captured.lock().unwrap() = Some(config.clone_without_data());
                Ok(respond_with(&config, ResponseData::default()))
            })
        }
    }

    impl Adapter for FnAdapter {
        fn send(&self, config: RequestConfig) -> BoxFuture<'static, crate::Result<Response>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let result = (self.respond)(config);
            Box::pin(async move { result })
        }
    }

    fn client_with(adapter: FnAdapter) -> Client {
        Client::builder().adapter(adapter).build().expect("client build")
    }

    fn url_only(url: &str) -> RequestConfig {
        RequestConfig {
            url: Some(url.to_owned()),
            ..RequestConfig::default()
        }
    }

    #[test]
    fn client_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<Client>();
    }

    #[test]
    fn clone_shares_state() {
        let client = client_with(FnAdapter::ok());
        let clone = client.clone();
        assert!(Arc::ptr_eq(&client.inner, &clone.inner));
    }

    #[test]
    fn build_requires_a_transport_or_adapter() {
        let err = Client::builder().build().unwrap_err();
        assert!(err.is_builder());
        assert_eq!(err.to_string(), "client requires a transport or adapter");
    }

    #[test]
    fn invalid_default_header_defers_to_build() {
        let err = Client::builder()
            .adapter(FnAdapter::ok())
            .default_header("bad name", "v")
            .build()
            .unwrap_err();
        assert!(err.is_builder());
        assert_eq!(err.to_string(), "invalid default header name");
    }

    #[test]
    fn verb_builders_seed_method_and_url() {
        let client = client_with(FnAdapter::ok());
        // (label, start, expected method)
        let cases: &[(&str, fn(&Client) -> RequestBuilder, Method)] = &[
            ("get", |c| c.get("/things"), Method::GET),
            ("post", |c| c.post("/things"), Method::POST),
            ("put", |c| c.put("/things"), Method::PUT),
            ("patch", |c| c.patch("/things"), Method::PATCH),
            ("delete", |c| c.delete("/things"), Method::DELETE),
            ("head", |c| c.head("/things"), Method::HEAD),
            ("options", |c| c.options("/things"), Method::OPTIONS),
        ];
        for (label, start, expected) in cases {
            let config = start(&client).build().unwrap();
            assert_eq!(config.method.as_ref(), Some(expected), "{label}: method");
            assert_eq!(config.url.as_deref(), Some("/things"), "{label}: url");
        }
    }

    #[test]
    fn request_merges_client_defaults() {
        let captured = Arc::new(Mutex::new(None));
        let adapter = FnAdapter::capturing(captured.clone());
        let client = Client::builder()
            .adapter(adapter)
            .base_url("https://api.test")
            .timeout(Duration::from_secs(5))
            .default_header("x-api-key", "secret")
            .build()
            .unwrap();

        block_on(client.request(url_only("/users"))).unwrap();

        let seen = captured.lock().unwrap().take().unwrap();
        assert_eq!(seen.base_url.as_deref(), Some("https://api.test"));
        assert_eq!(seen.timeout, Some(Duration::from_secs(5)));
        // The adapter sees flat headers: seeded Accept plus the common
        // default from the builder.
        assert_eq!(
            seen.headers.get(&ACCEPT).unwrap(),
            "application/json, text/plain, */*"
        );
        assert_eq!(
            seen.headers.get(&HeaderName::from_static("x-api-key")).unwrap(),
            "secret"
        );
    }

    #[test]
    fn method_falls_back_to_instance_defaults() {
        let captured = Arc::new(Mutex::new(None));
        let adapter = FnAdapter::capturing(captured.clone());
        let client = Client::builder()
            .adapter(adapter)
            .defaults(RequestConfig {
                method: Some(Method::DELETE),
                ..RequestConfig::default()
            })
            .build()
            .unwrap();

        block_on(client.request(url_only("/stale"))).unwrap();

        let seen = captured.lock().unwrap().take().unwrap();
        assert_eq!(seen.method, Some(Method::DELETE));
    }

    #[test]
    fn interceptors_wrap_the_dispatch_core() {
        let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
        let log = order.clone();
        let adapter = FnAdapter::new(move |config| {
            log.lock().unwrap().push("core");
            Ok(respond_with(&config, ResponseData::default()))
        });
        let client = client_with(adapter);

        for name in ["R1", "R2"] {
            let log = order.clone();
            client.request_interceptors().register(move |config| {
                log.lock().unwrap().push(name);
                Ok(config)
            });
        }
        for name in ["S1", "S2"] {
            let log = order.clone();
            client.response_interceptors().register(move |response| {
                log.lock().unwrap().push(name);
                Ok(response)
            });
        }

        block_on(client.request(url_only("/x"))).unwrap();

        // Request handlers run latest-registered first; response
        // handlers in registration order.
        assert_eq!(*order.lock().unwrap(), ["R2", "R1", "core", "S1", "S2"]);
    }

    #[test]
    fn request_interceptor_failure_skips_dispatch() {
        let adapter = FnAdapter::ok();
        let calls = adapter.calls.clone();
        let client = client_with(adapter);
        client
            .request_interceptors()
            .register(|_| Err(Error::transport("interceptor refused")));

        let err = block_on(client.request(url_only("/x"))).unwrap_err();
        assert_eq!(err.to_string(), "interceptor refused");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn rejected_handler_recovers_the_outcome() {
        let adapter = FnAdapter::new(|config| {
            Err(Error::transport("connection refused").with_config(config.clone_without_data()))
        });
        let client = client_with(adapter);
        client.response_interceptors().register_catch(Ok, |_err| {
            Ok(Response {
                status: StatusCode::OK,
                headers: HeaderMap::new(),
                data: ResponseData::Text("recovered".into()),
                config: RequestConfig::default(),
                request: wire_request(),
                url: None,
            })
        });

        let response = block_on(client.request(url_only("/x"))).unwrap();
        assert_eq!(response.text(), Some("recovered"));
    }

    #[test]
    fn ejected_interceptors_are_skipped() {
        let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
        let client = client_with(FnAdapter::ok());

        let log = order.clone();
        client.request_interceptors().register(move |config| {
            log.lock().unwrap().push("kept");
            Ok(config)
        });
        let log = order.clone();
        let ejected = client.request_interceptors().register(move |config| {
            log.lock().unwrap().push("ejected");
            Ok(config)
        });
        assert!(client.request_interceptors().eject(ejected));

        block_on(client.request(url_only("/x"))).unwrap();
        assert_eq!(*order.lock().unwrap(), ["kept"]);
    }

    #[test]
    fn create_isolates_interceptors_and_merges_defaults() {
        let captured = Arc::new(Mutex::new(None));
        let adapter = FnAdapter::capturing(captured.clone());
        let calls = adapter.calls.clone();
        let parent = Client::builder()
            .adapter(adapter)
            .base_url("https://api.test")
            .build()
            .unwrap();
        parent
            .request_interceptors()
            .register(|_| Err(Error::transport("parent only")));

        let child = parent.create(RequestConfig {
            timeout: Some(Duration::from_secs(9)),
            ..RequestConfig::default()
        });

        // The child shares the adapter but not the parent's registry.
        block_on(child.request(url_only("/x"))).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let seen = captured.lock().unwrap().take().unwrap();
        assert_eq!(seen.base_url.as_deref(), Some("https://api.test"));
        assert_eq!(seen.timeout, Some(Duration::from_secs(9)));

        let err = block_on(parent.request(url_only("/x"))).unwrap_err();
        assert_eq!(err.to_string(), "parent only");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn get_uri_renders_the_merged_query() {
        let client = client_with(FnAdapter::ok());

        let config = RequestConfig {
            url: Some("/search".to_owned()),
            params: Some(
                [
                    ("q".to_owned(), json!("rust http")),
                    ("page".to_owned(), json!(2)),
                ]
                .into_iter()
                .collect(),
            ),
            ..RequestConfig::default()
        };
        assert_eq!(client.get_uri(config), "/search?page=2&q=rust+http");
    }

    #[test]
    fn get_uri_without_a_url_has_no_question_mark_artifact() {
        let client = client_with(FnAdapter::ok());
        let config = RequestConfig {
            params: Some([("k".to_owned(), json!("v"))].into_iter().collect()),
            ..RequestConfig::default()
        };
        assert_eq!(client.get_uri(config), "k=v");
    }

    #[test]
    fn json_round_trip_through_the_default_pipeline() {
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        let adapter = FnAdapter::new(move |mut config| {
            let body = config
                .data
                .take()
                .and_then(|b| b.as_bytes().map(|bytes| bytes.to_vec()));
            *sink.lock().unwrap() = Some((body, config.headers.get(&CONTENT_TYPE).cloned()));
            Ok(respond_with(
                &config,
                ResponseData::Text("{\"ok\":true}".to_owned()),
            ))
        });
        let client = client_with(adapter);

        let response = block_on(client.post("/items").json(&json!({"a": 1})).send()).unwrap();

        let (body, content_type) = seen.lock().unwrap().take().unwrap();
        assert_eq!(body.as_deref(), Some(&b"{\"a\":1}"[..]));
        assert_eq!(content_type.unwrap(), "application/json;charset=utf-8");
        assert!(
            matches!(response.data(), ResponseData::Json(v) if v["ok"] == json!(true)),
            "response text should have parsed as JSON"
        );
    }
}
