//! The dispatch core.
//!
//! [`dispatch()`] sits between the interceptor chains and the adapter:
//! it runs the request transforms, flattens the header groups into the
//! wire set, picks the adapter, and applies the response transforms to
//! whatever comes back -- on the error path too, when the error carries
//! a response. Cancellation is checked before the adapter is invoked
//! and again after it settles, so a request observes at most one
//! cancellation error even when the token fires mid-exchange.

use std::sync::Arc;

use http::Method;

use crate::adapter::Adapter;
use crate::config::{ConfigHeaders, RequestConfig, ResponseTransform};
use crate::response::Response;

/// Run the response transform chain over a response's data in place.
///
/// A transform error propagates and replaces whatever outcome the
/// exchange had.
fn transform_response_data(
    response: &mut Response,
    transforms: &[ResponseTransform],
) -> crate::Result<()> {
    if transforms.is_empty() {
        return Ok(());
    }
    let mut data = response.take_data();
    for transform in transforms {
        data = transform(data, response.headers())?;
    }
    response.set_data(data);
    Ok(())
}

/// Dispatch one merged config through transforms and an adapter.
pub(crate) async fn dispatch(
    default_adapter: Arc<dyn Adapter>,
    mut config: RequestConfig,
) -> crate::Result<Response> {
    if let Some(token) = &config.cancel_token {
        token.ensure_not_cancelled()?;
    }

    // Request transforms see the layered headers, so a transform can
    // set a Content-Type without clobbering a caller-provided one.
    let request_transforms = config.transform_request.clone().unwrap_or_default();
    let mut data = config.data.take();
    for transform in &request_transforms {
        data = transform(data, &mut config.headers)?;
    }
    config.data = data;

    // Collapse the header groups into the exact wire set; interceptors
    // that inspect the config downstream of dispatch, and the adapter
    // itself, observe flat headers only.
    let method = config.method.clone().unwrap_or(Method::GET);
    config.headers = ConfigHeaders::from_flat(config.headers.flatten(&method));

    let adapter = config.adapter.clone().unwrap_or(default_adapter);

    // The config moves into the adapter; keep what the return path
    // needs.
    let token = config.cancel_token.clone();
    let response_transforms = config.transform_response.clone().unwrap_or_default();

    trace!(method = %method, "entering adapter");
    match adapter.send(config).await {
        Ok(mut response) => {
            if let Some(token) = &token {
                token.ensure_not_cancelled()?;
            }
            transform_response_data(&mut response, &response_transforms)?;
            Ok(response)
        }
        Err(mut err) => {
            // A cancellation is already final; everything else gets the
            // same post-flight treatment as a success, including
            // transforming the body of an attached error response.
            if !err.is_cancelled() {
                if let Some(token) = &token {
                    token.ensure_not_cancelled()?;
                }
                if let Some(response) = err.response_mut() {
                    transform_response_data(response, &response_transforms)?;
                }
            }
            Err(err)
        }
    }
}
