#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![deny(unsafe_op_in_unsafe_fn)]

#[macro_use]
mod tracing;

mod adapter;
mod body;
mod cancel;
mod client;
mod config;
mod dispatch;
mod encoding;
mod error;
mod interceptor;
mod params;
/// Proxy selection types.
pub mod proxy;
/// Redirect policy configuration.
pub mod redirect;
mod request;
mod response;
mod transform;
/// The transport seam: implement [`Transport`] to put requests on a wire.
pub mod transport;
mod util;

pub use adapter::{Adapter, HttpAdapter};
pub use body::{Body, BoxStream};
pub use cancel::{CancelToken, Canceler, Cancellation};
pub use client::{Client, ClientBuilder};
pub use config::{
    Auth, ConfigHeaders, ParamsSerializer, ProgressEvent, ProgressHandler, RequestConfig,
    RequestTransform, ResponseTransform, ResponseType, StatusValidator, merge_config,
};
pub use error::{BoxError, Error};
pub use interceptor::{InterceptorFn, InterceptorId, InterceptorManager, RecoveryFn};
pub use request::RequestBuilder;
pub use response::{Response, ResponseData};
pub use transform::{default_transform_request, default_transform_response};
pub use transport::Transport;
pub use util::{Spread, spread};

// ============================================================
// Common re-exports from the underlying crates
// ============================================================

pub use http::Method;
pub use http::StatusCode;
/// Re-export the `http::header` module for header name constants.
pub use http::header;
pub use http::header::HeaderMap;

pub use bytes::Bytes;
pub use futures_core::Stream;
pub use url::Url;

/// A `Result` alias where the `Err` case is [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
