//! The wire seam.
//!
//! The dispatch pipeline shapes each request into a [`TransportRequest`]
//! and hands it to a [`Transport`], which performs the actual network
//! exchange and yields a [`RawResponse`] whose body is an undecoded byte
//! stream. Everything above this seam (header merging, proxy selection,
//! redirects policy, decompression, transforms) is the library's job;
//! everything below it belongs to the transport implementation.
//!
//! The crate ships no socket code of its own. Embedders provide a
//! [`Transport`] backed by whatever HTTP engine suits their target and
//! register it via [`Client::new`](crate::Client::new) or
//! [`ClientBuilder::transport`](crate::ClientBuilder::transport).

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use http::{HeaderMap, Method, StatusCode};
use url::Url;

use crate::body::{Body, BoxStream};

pub use futures_util::future::BoxFuture;

/// A pluggable HTTP engine.
///
/// Implementations receive a fully shaped [`TransportRequest`] (headers
/// flattened, auth resolved, proxy applied) and must return the raw
/// response without decoding its body. Transport failures are reported
/// through [`Error::transport`](crate::Error::transport); exceeding the
/// redirect policy through [`Error::redirect`](crate::Error::redirect).
pub trait Transport: Send + Sync {
    /// Perform one HTTP exchange.
    fn send(&self, request: TransportRequest) -> BoxFuture<'static, crate::Result<RawResponse>>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, request: TransportRequest) -> BoxFuture<'static, crate::Result<RawResponse>> {
        (**self).send(request)
    }
}

/// A fully shaped request, ready for the wire.
pub struct TransportRequest {
    /// Request method.
    pub method: Method,
    /// Whether to negotiate TLS for this connection. When a proxy is in
    /// play this describes the hop to the proxy, not the origin.
    pub secure: bool,
    /// Host to connect to (the proxy host when proxied).
    pub hostname: String,
    /// Port to connect to.
    pub port: u16,
    /// Request target. Origin-form (`/path?query`) for direct requests,
    /// absolute-form (`http://origin/path?query`) when proxied.
    pub path: String,
    /// Flattened request headers.
    pub headers: HeaderMap,
    /// Basic credentials as `user:password`, not yet base64-encoded.
    /// Transports that authenticate natively may consume this instead
    /// of an `Authorization` header.
    pub basic_auth: Option<String>,
    /// How many redirects the transport may follow.
    pub redirect: crate::redirect::Policy,
    /// Upper bound on the serialized request body, enforced by the
    /// transport where it streams the body out.
    pub max_body_length: Option<u64>,
    /// Unix domain socket path overriding hostname/port dialing.
    pub socket_path: Option<String>,
    /// Connection agent for plain-HTTP hops.
    pub http_agent: Option<AgentHandle>,
    /// Connection agent for TLS hops.
    pub https_agent: Option<AgentHandle>,
    /// Request body, if any.
    pub body: Option<Body>,
}

impl TransportRequest {
    /// Scheme implied by [`secure`](Self::secure).
    pub fn scheme(&self) -> &'static str {
        if self.secure { "https" } else { "http" }
    }

    /// Copy of this request with the body dropped.
    ///
    /// Errors and responses echo the request that produced them; bodies
    /// may be single-shot streams, so the echo never carries one.
    pub(crate) fn clone_without_body(&self) -> TransportRequest {
        TransportRequest {
            method: self.method.clone(),
            secure: self.secure,
            hostname: self.hostname.clone(),
            port: self.port,
            path: self.path.clone(),
            headers: self.headers.clone(),
            basic_auth: self.basic_auth.clone(),
            redirect: self.redirect.clone(),
            max_body_length: self.max_body_length,
            socket_path: self.socket_path.clone(),
            http_agent: self.http_agent.clone(),
            https_agent: self.https_agent.clone(),
            body: None,
        }
    }
}

impl fmt::Debug for TransportRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportRequest")
            .field("method", &self.method)
            .field("secure", &self.secure)
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .field("path", &self.path)
            .field("headers", &self.headers)
            // Do not leak credentials through Debug output.
            .field("basic_auth", &self.basic_auth.as_ref().map(|_| "<redacted>"))
            .field("redirect", &self.redirect)
            .field("body", &self.body)
            .finish_non_exhaustive()
    }
}

/// What came back over the wire, before any decoding.
pub struct RawResponse {
    /// Response status.
    pub status: StatusCode,
    /// Response headers as received.
    pub headers: HeaderMap,
    /// The method of the final exchange. Differs from the request
    /// method when a redirect rewrote it.
    pub method: Method,
    /// The final URL after any redirects the transport followed.
    pub url: Option<Url>,
    /// Undecoded response body.
    pub body: BoxStream,
}

impl fmt::Debug for RawResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("method", &self.method)
            .field("url", &self.url.as_ref().map(Url::as_str))
            .field("body", &"<stream>")
            .finish()
    }
}

/// Opaque connection-agent handle.
///
/// Agents (connection pools, keep-alive managers, TLS session caches)
/// are a transport concern; the pipeline only routes them through. The
/// handle is shared, so cloning a config does not duplicate the agent.
#[derive(Clone)]
pub struct AgentHandle(Arc<dyn Any + Send + Sync>);

impl AgentHandle {
    /// Wrap a transport-defined agent value.
    pub fn new<T: Any + Send + Sync>(agent: T) -> Self {
        AgentHandle(Arc::new(agent))
    }

    /// Recover the concrete agent, if the type matches.
    pub fn downcast_ref<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }
}

impl fmt::Debug for AgentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AgentHandle")
    }
}
