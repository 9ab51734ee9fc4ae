//! Default body transforms.
//!
//! Transforms are the hook between user data and the wire. The request
//! pipeline maps the outgoing body (with mutable access to the config
//! headers) before the adapter runs; the response pipeline maps the
//! buffered response data before the caller sees it. A config carries
//! a list of each; setting a list replaces the defaults wholesale.
//!
//! The defaults installed by
//! [`RequestConfig::with_defaults()`](crate::RequestConfig::with_defaults)
//! implement the JSON convention: structured request bodies serialize to
//! a JSON string (tagging `Content-Type` when none was set), and text
//! response bodies that parse as JSON come back as structured data.

use std::sync::Arc;

use http::HeaderValue;

use crate::body::{Body, BodyInner};
use crate::config::{RequestTransform, ResponseTransform};
use crate::response::ResponseData;

/// The default request transform.
///
/// [`Body::json()`] bodies are serialized with `serde_json` and the
/// request `Content-Type` is set to `application/json;charset=utf-8`
/// unless one was already given for this request. Text, byte, and
/// streaming bodies pass through untouched.
pub fn default_transform_request() -> RequestTransform {
    Arc::new(|data, headers| {
        let Some(body) = data else {
            return Ok(None);
        };
        match body.into_inner() {
            BodyInner::Json(value) => {
                let text = serde_json::to_string(&value).map_err(|e| {
                    crate::Error::body("JSON body serialization failed").with_source(e)
                })?;
                if headers.get(&http::header::CONTENT_TYPE).is_none() {
                    headers.insert(
                        http::header::CONTENT_TYPE,
                        HeaderValue::from_static("application/json;charset=utf-8"),
                    );
                }
                Ok(Some(Body::from(text)))
            }
            other => Ok(Some(Body::from_inner(other))),
        }
    })
}

/// The default response transform.
///
/// Text data that parses as JSON becomes [`ResponseData::Json`]; text
/// that does not parse stays text. Byte and stream data pass through.
pub fn default_transform_response() -> ResponseTransform {
    Arc::new(|data, _headers| match data {
        ResponseData::Text(text) => match serde_json::from_str(&text) {
            Ok(value) => Ok(ResponseData::Json(value)),
            Err(_) => Ok(ResponseData::Text(text)),
        },
        other => Ok(other),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigHeaders;
    use http::HeaderMap;
    use http::header::CONTENT_TYPE;
    use serde_json::json;

    fn run_request(
        data: Option<Body>,
        headers: &mut ConfigHeaders,
    ) -> crate::Result<Option<Body>> {
        default_transform_request()(data, headers)
    }

    fn run_response(data: ResponseData) -> ResponseData {
        default_transform_response()(data, &HeaderMap::new()).unwrap()
    }

    #[test]
    fn request_serializes_json_and_tags_content_type() {
        let mut headers = ConfigHeaders::new();
        let body = Body::json(json!({"name": "widget", "count": 2}));

        let out = run_request(Some(body), &mut headers).unwrap().unwrap();
        let text = std::str::from_utf8(out.as_bytes().unwrap()).unwrap();
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(text).unwrap(),
            json!({"name": "widget", "count": 2})
        );
        assert_eq!(
            headers.get(&CONTENT_TYPE).unwrap(),
            "application/json;charset=utf-8"
        );
    }

    #[test]
    fn request_respects_existing_content_type() {
        let mut headers = ConfigHeaders::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/vnd.api+json"),
        );

        run_request(Some(Body::json(json!({}))), &mut headers)
            .unwrap()
            .unwrap();
        assert_eq!(headers.get(&CONTENT_TYPE).unwrap(), "application/vnd.api+json");
    }

    #[test]
    fn request_passes_other_bodies_through() {
        let mut headers = ConfigHeaders::new();

        let out = run_request(Some(Body::from("raw text")), &mut headers)
            .unwrap()
            .unwrap();
        assert_eq!(out.as_bytes().unwrap(), b"raw text");

        let out = run_request(Some(Body::from(vec![1u8, 2, 3])), &mut headers)
            .unwrap()
            .unwrap();
        assert_eq!(out.as_bytes().unwrap(), &[1, 2, 3]);

        let stream = Body::wrap_stream(futures_util::stream::iter(vec![Ok::<
            _,
            std::io::Error,
        >(
            bytes::Bytes::from("chunk"),
        )]));
        let out = run_request(Some(stream), &mut headers).unwrap().unwrap();
        assert!(out.is_stream());

        // No content-type appears for pass-through bodies.
        assert!(headers.get(&CONTENT_TYPE).is_none());
    }

    #[test]
    fn request_keeps_empty_body_empty() {
        let mut headers = ConfigHeaders::new();
        assert!(run_request(None, &mut headers).unwrap().is_none());
        assert!(headers.get(&CONTENT_TYPE).is_none());
    }

    #[test]
    fn response_parses_json_text() {
        let out = run_response(ResponseData::Text("{\"ok\": true}".to_owned()));
        match out {
            ResponseData::Json(v) => assert_eq!(v, json!({"ok": true})),
            other => panic!("expected Json, got {other:?}"),
        }
    }

    #[test]
    fn response_keeps_non_json_text() {
        let out = run_response(ResponseData::Text("<html>hi</html>".to_owned()));
        match out {
            ResponseData::Text(s) => assert_eq!(s, "<html>hi</html>"),
            other => panic!("expected Text, got {other:?}"),
        }
    }

    #[test]
    fn response_passes_bytes_through() {
        let out = run_response(ResponseData::Bytes(bytes::Bytes::from_static(b"{\"a\":1}")));
        match out {
            // Bytes are never parsed, even when they look like JSON.
            ResponseData::Bytes(b) => assert_eq!(&b[..], b"{\"a\":1}"),
            other => panic!("expected Bytes, got {other:?}"),
        }
    }
}
