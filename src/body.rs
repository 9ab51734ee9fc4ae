//! Request body type.
//!
//! [`Body`] wraps request data. It can be created from in-memory types
//! (`String`, `Vec<u8>`, `Bytes`, etc.), from a JSON value via
//! [`Body::json()`], or from an async stream via [`Body::wrap_stream()`],
//! matching the
//! [`reqwest::Body`](https://docs.rs/reqwest/latest/reqwest/struct.Body.html)
//! API surface.
//!
//! A JSON body is carried as a structured `serde_json::Value` until the
//! request transforms run; the default request transform serializes it to
//! text and sets the `Content-Type` header. Transports never see the JSON
//! variant.

use bytes::Bytes;
use std::pin::Pin;

use crate::error::BoxError;

/// Boxed stream of byte chunks, used for streaming request and response
/// bodies.
///
/// `Sync` is part of the contract: bodies ride inside [`Client`]s shared
/// across threads and inside [`Error`]s asserted `Send + Sync`, so the
/// boxed stream must be shareable too.
///
/// [`Client`]: crate::Client
/// [`Error`]: crate::Error
pub type BoxStream =
    Pin<Box<dyn futures_core::Stream<Item = Result<Bytes, BoxError>> + Send + Sync>>;

/// A request body.
///
/// Can be created from `String`, `&str`, `Vec<u8>`, `&[u8]`, or `Bytes`
/// (in-memory), from a `serde_json::Value` via [`json()`](Self::json), or
/// from an async stream via [`wrap_stream()`](Self::wrap_stream).
///
/// # Example
///
/// ```rust,no_run
/// use courier::Body;
///
/// // In-memory
/// let body: Body = "hello".into();
/// let body: Body = b"bytes".to_vec().into();
///
/// // Structured, serialized by the default request transform
/// let body = Body::json(serde_json::json!({ "name": "widget" }));
///
/// // From a stream
/// let stream = futures_util::stream::iter(vec![
///     Ok::<_, std::io::Error>(bytes::Bytes::from("chunk1")),
///     Ok(bytes::Bytes::from("chunk2")),
/// ]);
/// let body = Body::wrap_stream(stream);
/// ```
pub struct Body {
    inner: BodyInner,
}

pub(crate) enum BodyInner {
    /// UTF-8 text body.
    Text(String),
    /// In-memory body bytes.
    Bytes(Bytes),
    /// Structured JSON body, serialized by the request transforms.
    Json(serde_json::Value),
    /// Streaming body -- sent incrementally via chunked transfer encoding.
    Stream(BoxStream),
}

impl std::fmt::Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            BodyInner::Text(s) => f
                .debug_struct("Body")
                .field("kind", &"text")
                .field("length", &s.len())
                .finish(),
            BodyInner::Bytes(b) => f
                .debug_struct("Body")
                .field("kind", &"bytes")
                .field("length", &b.len())
                .finish(),
            BodyInner::Json(_) => f.debug_struct("Body").field("kind", &"json").finish(),
            BodyInner::Stream(_) => f.debug_struct("Body").field("kind", &"stream").finish(),
        }
    }
}

impl Body {
    /// Create a structured JSON body.
    ///
    /// The value is held as-is until the request transforms run; the
    /// default request transform serializes it with `serde_json` and sets
    /// `Content-Type: application/json;charset=utf-8` when no content
    /// type was given. If the transform list is replaced with one that
    /// leaves the value untouched, dispatch rejects the request with a
    /// body error.
    pub fn json(value: serde_json::Value) -> Body {
        Body {
            inner: BodyInner::Json(value),
        }
    }

    /// View the body contents as a byte slice.
    ///
    /// Returns `None` for JSON bodies (not yet serialized) and for
    /// streaming bodies (created via [`wrap_stream()`](Self::wrap_stream)).
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.inner {
            BodyInner::Text(s) => Some(s.as_bytes()),
            BodyInner::Bytes(b) => Some(b),
            BodyInner::Json(_) | BodyInner::Stream(_) => None,
        }
    }

    /// View the body as a structured JSON value, if it is one.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match &self.inner {
            BodyInner::Json(v) => Some(v),
            _ => None,
        }
    }

    /// Whether this body is a stream.
    pub fn is_stream(&self) -> bool {
        matches!(self.inner, BodyInner::Stream(_))
    }

    /// Wrap an async stream as a request body.
    ///
    /// The stream is forwarded to the transport chunk by chunk, so the
    /// entire body does not need to fit in memory. Streaming bodies skip
    /// the `Content-Length` header; transports send them with chunked
    /// transfer encoding.
    ///
    /// Matches [`reqwest::Body::wrap_stream()`](https://docs.rs/reqwest/latest/reqwest/struct.Body.html#method.wrap_stream).
    pub fn wrap_stream<S, O, E>(stream: S) -> Body
    where
        S: futures_core::Stream<Item = Result<O, E>> + Send + Sync + 'static,
        O: Into<Bytes> + 'static,
        E: Into<BoxError> + 'static,
    {
        use futures_util::StreamExt;
        let mapped = stream.map(|result| result.map(|o| o.into()).map_err(|e| e.into()));
        Body {
            inner: BodyInner::Stream(Box::pin(mapped)),
        }
    }

    /// Try to clone this body.
    ///
    /// Returns `None` for streaming bodies (created via
    /// [`wrap_stream()`](Self::wrap_stream)), since streams cannot be
    /// replayed.
    pub fn try_clone(&self) -> Option<Body> {
        match &self.inner {
            BodyInner::Text(s) => Some(Body {
                inner: BodyInner::Text(s.clone()),
            }),
            BodyInner::Bytes(b) => Some(Body {
                inner: BodyInner::Bytes(b.clone()),
            }),
            BodyInner::Json(v) => Some(Body {
                inner: BodyInner::Json(v.clone()),
            }),
            BodyInner::Stream(_) => None,
        }
    }

    /// Decompose the body into its inner representation.
    pub(crate) fn into_inner(self) -> BodyInner {
        self.inner
    }

    pub(crate) fn from_inner(inner: BodyInner) -> Body {
        Body { inner }
    }

    /// Convert this body into a byte stream.
    ///
    /// In-memory bodies yield a single chunk; streaming bodies are
    /// returned as-is. JSON bodies are serialized first, with failures
    /// surfaced through the stream.
    pub fn into_stream(self) -> BoxStream {
        use futures_util::stream;
        match self.inner {
            BodyInner::Text(s) => Box::pin(stream::once(async move { Ok(Bytes::from(s)) })),
            BodyInner::Bytes(b) => Box::pin(stream::once(async move { Ok(b) })),
            BodyInner::Json(v) => Box::pin(stream::once(async move {
                serde_json::to_vec(&v)
                    .map(Bytes::from)
                    .map_err(|e| Box::new(e) as BoxError)
            })),
            BodyInner::Stream(s) => s,
        }
    }

    /// Consume the body and collect it into bytes.
    ///
    /// For in-memory bodies this is cheap. For streaming bodies this
    /// reads the entire stream into memory. JSON bodies are serialized.
    pub async fn into_bytes(self) -> Result<Vec<u8>, crate::Error> {
        match self.inner {
            BodyInner::Text(s) => Ok(s.into_bytes()),
            BodyInner::Bytes(b) => Ok(b.to_vec()),
            BodyInner::Json(v) => serde_json::to_vec(&v)
                .map_err(|e| crate::Error::body("JSON body serialization failed").with_source(e)),
            BodyInner::Stream(mut stream) => {
                use futures_util::StreamExt;
                let mut buf = Vec::new();
                while let Some(chunk) = stream.next().await {
                    let bytes =
                        chunk.map_err(|e| crate::Error::body(format!("stream body error: {e}")))?;
                    buf.extend_from_slice(&bytes);
                }
                Ok(buf)
            }
        }
    }
}

impl From<Vec<u8>> for Body {
    fn from(v: Vec<u8>) -> Self {
        Self {
            inner: BodyInner::Bytes(Bytes::from(v)),
        }
    }
}

impl From<&'static [u8]> for Body {
    fn from(s: &'static [u8]) -> Self {
        Self {
            inner: BodyInner::Bytes(Bytes::from_static(s)),
        }
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Self {
            inner: BodyInner::Text(s),
        }
    }
}

impl From<&'static str> for Body {
    fn from(s: &'static str) -> Self {
        Self {
            inner: BodyInner::Text(s.to_owned()),
        }
    }
}

impl From<Bytes> for Body {
    fn from(b: Bytes) -> Self {
        Self {
            inner: BodyInner::Bytes(b),
        }
    }
}

impl From<serde_json::Value> for Body {
    fn from(v: serde_json::Value) -> Self {
        Body::json(v)
    }
}

impl Default for Body {
    /// Create an empty body.
    fn default() -> Self {
        Self {
            inner: BodyInner::Bytes(Bytes::new()),
        }
    }
}
