//! Error type for courier.
//!
//! Provides [`Error`] with query methods for every failure class the
//! dispatch pipeline produces: [`is_builder()`](Error::is_builder),
//! [`is_body()`](Error::is_body), [`is_status()`](Error::is_status),
//! [`is_content_length()`](Error::is_content_length),
//! [`is_timeout()`](Error::is_timeout),
//! [`is_cancelled()`](Error::is_cancelled),
//! [`is_transport()`](Error::is_transport),
//! [`is_redirect()`](Error::is_redirect), and
//! [`is_decode()`](Error::is_decode).
//!
//! Errors raised while a request was in flight carry the merged
//! [`RequestConfig`] and the [`TransportRequest`] that was on the wire;
//! status errors additionally carry the settled [`Response`].

use http::StatusCode;
use std::fmt;

use crate::cancel::Cancellation;
use crate::config::RequestConfig;
use crate::response::Response;
use crate::transport::TransportRequest;

/// Boxed error type used in source chains and stream items.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The error type for courier operations.
///
/// Errors carry a `kind` classification that powers the `is_*()` query
/// methods. `Display` shows the human-readable message (for status
/// errors this is `Request failed with status code <code>`); the
/// underlying cause, when one exists, is reachable through
/// [`std::error::Error::source`].
pub struct Error {
    pub(crate) kind: ErrorKind,
    pub(crate) message: String,
    pub(crate) source: Option<BoxError>,
    pub(crate) status: Option<StatusCode>,
    pub(crate) config: Option<Box<RequestConfig>>,
    pub(crate) request: Option<Box<TransportRequest>>,
    pub(crate) response: Option<Box<Response>>,
}

/// Classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorKind {
    /// Client construction error (e.g. no transport configured).
    Builder,
    /// Request body rejected (unserialized JSON reaching the adapter,
    /// stream read failure).
    Body,
    /// HTTP status rejected by the configured status validator.
    Status,
    /// Buffered response body exceeded `max_content_length`.
    ContentLength,
    /// The configured deadline elapsed before the exchange settled.
    Timeout,
    /// The request was cancelled through its [`CancelToken`](crate::CancelToken).
    Cancelled,
    /// Connection-level transport failure (DNS, TCP, TLS, I/O).
    Transport,
    /// Redirect error (e.g. the transport exhausted its redirect limit).
    Redirect,
    /// Response body decoding error (JSON deserialization, charset
    /// conversion).
    Decode,
}

impl Error {
    /// Returns `true` if this is a builder error.
    pub fn is_builder(&self) -> bool {
        matches!(self.kind, ErrorKind::Builder)
    }

    /// Returns `true` if this is a request body error.
    ///
    /// Raised when a structured JSON body reaches the adapter without
    /// having been serialized by a request transform, or when a
    /// streaming body fails mid-read.
    pub fn is_body(&self) -> bool {
        matches!(self.kind, ErrorKind::Body)
    }

    /// Returns `true` if this error was produced by the status
    /// validator rejecting the response status code.
    ///
    /// The rejected [`Response`] is available via
    /// [`response()`](Error::response).
    pub fn is_status(&self) -> bool {
        matches!(self.kind, ErrorKind::Status)
    }

    /// Returns `true` if the response body grew past the configured
    /// `max_content_length` while buffering.
    pub fn is_content_length(&self) -> bool {
        matches!(self.kind, ErrorKind::ContentLength)
    }

    /// Returns `true` if this is a timeout error.
    pub fn is_timeout(&self) -> bool {
        matches!(self.kind, ErrorKind::Timeout)
    }

    /// Returns `true` if the request was cancelled through its
    /// [`CancelToken`](crate::CancelToken).
    pub fn is_cancelled(&self) -> bool {
        matches!(self.kind, ErrorKind::Cancelled)
    }

    /// Returns `true` if this is a connection-level transport error.
    pub fn is_transport(&self) -> bool {
        matches!(self.kind, ErrorKind::Transport)
    }

    /// Returns `true` if this is a redirect error, e.g. the transport
    /// gave up after exhausting its redirect limit.
    pub fn is_redirect(&self) -> bool {
        matches!(self.kind, ErrorKind::Redirect)
    }

    /// Returns `true` if this is a response body decoding error.
    pub fn is_decode(&self) -> bool {
        matches!(self.kind, ErrorKind::Decode)
    }

    /// Returns the HTTP status code, if this is a status error.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Returns the merged request configuration the failed request ran
    /// with, when the failure happened after config resolution.
    ///
    /// The echoed config never carries the request body; by the time an
    /// error can be raised the body has already moved into the
    /// transport.
    pub fn config(&self) -> Option<&RequestConfig> {
        self.config.as_deref()
    }

    /// Returns the transport request that was on the wire when the
    /// failure happened, if the exchange got that far.
    pub fn request(&self) -> Option<&TransportRequest> {
        self.request.as_deref()
    }

    /// Returns the settled response, if this error carries one.
    ///
    /// Status errors always do; other kinds never reach settlement.
    pub fn response(&self) -> Option<&Response> {
        self.response.as_deref()
    }

    pub(crate) fn response_mut(&mut self) -> Option<&mut Response> {
        self.response.as_deref_mut()
    }

    /// Consume the error, returning the settled response it carries.
    ///
    /// This is how a rejected interceptor handler salvages a response
    /// the status validator turned away: detach it and return it as the
    /// chain's success value.
    pub fn into_response(self) -> Option<Response> {
        self.response.map(|response| *response)
    }

    /// Attach the merged request configuration (builder pattern).
    #[must_use]
    pub fn with_config(mut self, config: RequestConfig) -> Self {
        self.config = Some(Box::new(config));
        self
    }

    /// Attach the transport request (builder pattern).
    #[must_use]
    pub fn with_request(mut self, request: TransportRequest) -> Self {
        self.request = Some(Box::new(request));
        self
    }

    /// Attach the settled response (builder pattern).
    #[must_use]
    pub fn with_response(mut self, response: Response) -> Self {
        self.status = Some(response.status());
        self.response = Some(Box::new(response));
        self
    }

    /// Attach a source error (builder pattern).
    ///
    /// Stores the underlying cause so that
    /// [`std::error::Error::source`] returns it, making error chains
    /// inspectable by `anyhow`, `eyre`, and manual walks.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    // -- Constructors --

    /// Shared constructor for simple error kinds (no source, no status,
    /// no attached context).
    fn with_kind(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            message: msg.into(),
            source: None,
            status: None,
            config: None,
            request: None,
            response: None,
        }
    }

    /// Create a connection-level transport error.
    ///
    /// This is the constructor [`Transport`](crate::Transport)
    /// implementations use for DNS, TCP, TLS, and I/O failures.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Transport, msg)
    }

    /// Create a redirect error.
    ///
    /// [`Transport`](crate::Transport) implementations return this when
    /// they exhaust the redirect limit carried in
    /// [`TransportRequest::redirect`].
    pub fn redirect(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Redirect, msg)
    }

    /// Create a request body error.
    pub fn body(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Body, msg)
    }

    /// Create a decode error (JSON deserialization, charset conversion).
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Decode, msg)
    }

    /// Create a status error for a status code the validator rejected.
    pub fn status_error(code: StatusCode) -> Self {
        let mut err = Self::with_kind(
            ErrorKind::Status,
            format!("Request failed with status code {}", code.as_u16()),
        );
        err.status = Some(code);
        err
    }

    /// Create a builder-phase error.
    pub(crate) fn builder(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Builder, msg)
    }

    /// Create a timeout error.
    pub(crate) fn timeout(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Timeout, msg)
    }

    /// Create a content-length ceiling error.
    pub(crate) fn content_length(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::ContentLength, msg)
    }

    /// Create a cancellation error from a token's reason.
    pub(crate) fn cancelled(reason: Cancellation) -> Self {
        Self::with_kind(ErrorKind::Cancelled, reason.to_string())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Error")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .field("status", &self.status)
            .field("response", &self.response.as_ref().map(|r| r.status()))
            .field("source", &self.source)
            .finish()
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| &**e as &(dyn std::error::Error + 'static))
    }
}

// Ensure Error is Send + Sync (required for async use).
const _: () = {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Error>();
};
