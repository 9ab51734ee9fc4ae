//! HTTP response.
//!
//! [`Response`] is a settled response: by the time one reaches the
//! caller the adapter has already buffered the body (unless streaming
//! was requested), run decompression and charset decode, and the
//! response transforms have shaped [`ResponseData`]. The config and
//! wire-level request that produced the response travel along as
//! echoes for inspection.

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::body::BoxStream;
use crate::config::RequestConfig;
use crate::error::Error;
use crate::transport::TransportRequest;

/// The body of a settled [`Response`].
///
/// Which variant the caller sees follows the request's
/// [`ResponseType`](crate::ResponseType) and the response transforms:
/// the default transform promotes JSON-looking text to `Json`, a
/// `Bytes` request keeps the raw bytes, and a `Stream` request hands
/// the connection over without buffering.
pub enum ResponseData {
    /// Parsed JSON document.
    Json(serde_json::Value),
    /// Decoded text.
    Text(String),
    /// Raw body bytes.
    Bytes(Bytes),
    /// Unbuffered body stream. Transforms and the content-length
    /// ceiling do not apply.
    Stream(BoxStream),
}

impl ResponseData {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            ResponseData::Json(_) => "json",
            ResponseData::Text(_) => "text",
            ResponseData::Bytes(_) => "bytes",
            ResponseData::Stream(_) => "stream",
        }
    }

    /// Whether this is the streaming variant.
    pub fn is_stream(&self) -> bool {
        matches!(self, ResponseData::Stream(_))
    }
}

impl Default for ResponseData {
    fn default() -> Self {
        ResponseData::Bytes(Bytes::new())
    }
}

impl std::fmt::Debug for ResponseData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseData::Json(v) => f.debug_tuple("Json").field(v).finish(),
            ResponseData::Text(s) => f.debug_tuple("Text").field(s).finish(),
            ResponseData::Bytes(b) => f
                .debug_struct("Bytes")
                .field("length", &b.len())
                .finish(),
            ResponseData::Stream(_) => f.write_str("Stream"),
        }
    }
}

/// A settled HTTP response.
///
/// Produced by the dispatch pipeline once the adapter has exchanged the
/// request, the status validator has accepted the status, and the
/// response transforms have run.
pub struct Response {
    pub(crate) status: StatusCode,
    pub(crate) headers: HeaderMap,
    pub(crate) data: ResponseData,
    pub(crate) config: RequestConfig,
    pub(crate) request: TransportRequest,
    pub(crate) url: Option<Url>,
}

impl Response {
    /// Response status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Response headers.
    ///
    /// When the body was transparently decompressed, `content-encoding`
    /// has been removed; the remaining headers are as received.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable access to the response headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Final URL of the exchange, when the transport reported one.
    ///
    /// Differs from the requested URL when redirects were followed.
    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// The transformed response body.
    pub fn data(&self) -> &ResponseData {
        &self.data
    }

    /// Mutable access to the response body, for response interceptors
    /// that rewrite it.
    pub fn data_mut(&mut self) -> &mut ResponseData {
        &mut self.data
    }

    /// Consume the response, returning the body.
    pub fn into_data(self) -> ResponseData {
        self.data
    }

    /// The body as text, when it settled as the text variant.
    pub fn text(&self) -> Option<&str> {
        match &self.data {
            ResponseData::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Deserialize the body into `T`.
    ///
    /// Works from the JSON, text, and bytes variants; a streaming body
    /// has nothing buffered to deserialize and errors. Failures are
    /// reported as decode errors.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        let result = match &self.data {
            ResponseData::Json(v) => serde_json::from_value(v.clone()),
            ResponseData::Text(s) => serde_json::from_str(s),
            ResponseData::Bytes(b) => serde_json::from_slice(b),
            ResponseData::Stream(_) => {
                return Err(Error::decode(
                    "streaming response has no buffered body to deserialize",
                ));
            }
        };
        result.map_err(|e| Error::decode("JSON deserialization failed").with_source(e))
    }

    /// The merged config that produced this response.
    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    /// The wire-level request the transport saw.
    pub fn request(&self) -> &TransportRequest {
        &self.request
    }

    /// Detach the body, leaving an empty `Bytes` placeholder. Dispatch
    /// uses this to run the response transforms over owned data.
    pub(crate) fn take_data(&mut self) -> ResponseData {
        std::mem::take(&mut self.data)
    }

    pub(crate) fn set_data(&mut self, data: ResponseData) {
        self.data = data;
    }
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("url", &self.url.as_ref().map(Url::as_str))
            .field("data", &self.data.kind())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use serde_json::json;

    /// Build a settled `Response` for unit tests; no transport involved.
    fn synthetic(status: StatusCode, headers: HeaderMap, data: ResponseData) -> Response {
        Response {
            status,
            headers,
            data,
            config: RequestConfig::default(),
            request: TransportRequest {
                method: Method::GET,
                secure: false,
                hostname: "test.example.com".into(),
                port: 80,
                path: "/path".into(),
                headers: HeaderMap::new(),
                basic_auth: None,
                redirect: crate::redirect::Policy::default(),
                max_body_length: None,
                socket_path: None,
                http_agent: None,
                https_agent: None,
                body: None,
            },
            url: Url::parse("http://test.example.com/path").ok(),
        }
    }

    fn stream_data() -> ResponseData {
        ResponseData::Stream(Box::pin(futures_util::stream::empty()))
    }

    #[test]
    fn accessors_return_constructed_values() {
        let mut headers = HeaderMap::new();
        headers.insert("x-custom", "test-value".parse().unwrap());
        let resp = synthetic(StatusCode::OK, headers, ResponseData::Text("hi".into()));

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get("x-custom").unwrap(), "test-value");
        assert_eq!(resp.url().map(Url::as_str), Some("http://test.example.com/path"));
        assert_eq!(resp.request().hostname, "test.example.com");
        assert_eq!(resp.text(), Some("hi"));
    }

    #[test]
    fn text_is_none_for_other_variants() {
        let cases = [
            ("json", ResponseData::Json(json!({"a": 1}))),
            ("bytes", ResponseData::Bytes(Bytes::from_static(b"raw"))),
            ("stream", stream_data()),
        ];
        for (label, data) in cases {
            let resp = synthetic(StatusCode::OK, HeaderMap::new(), data);
            assert!(resp.text().is_none(), "{label}");
        }
    }

    #[test]
    fn json_deserializes_from_buffered_variants() {
        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct Widget {
            name: String,
            count: u32,
        }
        let expected = Widget {
            name: "bolt".into(),
            count: 3,
        };

        let cases = [
            ("json", ResponseData::Json(json!({"name": "bolt", "count": 3}))),
            ("text", ResponseData::Text("{\"name\":\"bolt\",\"count\":3}".into())),
            (
                "bytes",
                ResponseData::Bytes(Bytes::from_static(b"{\"name\":\"bolt\",\"count\":3}")),
            ),
        ];
        for (label, data) in cases {
            let resp = synthetic(StatusCode::OK, HeaderMap::new(), data);
            assert_eq!(resp.json::<Widget>().unwrap(), expected, "{label}");
        }
    }

    #[test]
    fn json_errors_are_decode_errors() {
        let resp = synthetic(
            StatusCode::OK,
            HeaderMap::new(),
            ResponseData::Text("not json".into()),
        );
        let err = resp.json::<serde_json::Value>().unwrap_err();
        assert!(err.is_decode());

        let resp = synthetic(StatusCode::OK, HeaderMap::new(), stream_data());
        let err = resp.json::<serde_json::Value>().unwrap_err();
        assert!(err.is_decode());
    }

    #[test]
    fn into_data_and_take_data() {
        let mut resp = synthetic(
            StatusCode::OK,
            HeaderMap::new(),
            ResponseData::Text("body".into()),
        );
        let taken = resp.take_data();
        assert!(matches!(taken, ResponseData::Text(s) if s == "body"));
        // The placeholder left behind is empty bytes.
        assert!(matches!(resp.data(), ResponseData::Bytes(b) if b.is_empty()));

        resp.set_data(ResponseData::Json(json!(1)));
        assert!(matches!(resp.into_data(), ResponseData::Json(v) if v == json!(1)));
    }

    #[test]
    fn debug_shows_status_and_data_kind() {
        let resp = synthetic(
            StatusCode::NOT_FOUND,
            HeaderMap::new(),
            ResponseData::Json(json!({})),
        );
        let rendered = format!("{resp:?}");
        assert!(rendered.contains("404"), "{rendered}");
        assert!(rendered.contains("json"), "{rendered}");
        assert!(rendered.contains("test.example.com"), "{rendered}");
    }

    #[test]
    fn response_data_debug() {
        assert_eq!(
            format!("{:?}", ResponseData::Bytes(Bytes::from_static(b"abcd"))),
            "Bytes { length: 4 }"
        );
        assert_eq!(format!("{:?}", stream_data()), "Stream");
        assert!(format!("{:?}", ResponseData::Text("t".into())).starts_with("Text"));
    }
}
