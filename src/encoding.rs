//! Response body decoding.
//!
//! Two concerns live here, both applied by the adapter between the wire
//! and the caller:
//!
//! * **Decompression** -- when a response carries
//!   `Content-Encoding: gzip`, `compress`, or `deflate`, the byte stream
//!   is wrapped in a [`DecodeStream`] that inflates chunks as they
//!   arrive. The container format is sniffed from the first two bytes
//!   (`1f 8b` means gzip, anything else is treated as a zlib stream),
//!   so servers that send raw zlib under the `deflate` label still
//!   decode. Decompression failures surface as stream errors.
//!
//! * **Text decoding** -- byte bodies destined for `Text` or `Json`
//!   response data are decoded per the request's `response_encoding`:
//!   UTF-8 (lossy) by default, `latin1`/`binary` as byte identity, and
//!   `ascii` with the high bit masked. Unknown labels fall back to
//!   lossy UTF-8.

use std::io::Write;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use flate2::write::{GzDecoder, ZlibDecoder};
use futures_core::Stream;

use crate::body::BoxStream;
use crate::error::BoxError;

/// Gzip member magic, per RFC 1952.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Whether a `Content-Encoding` value names a compression this module
/// can undo. The comparison is exact after trimming; multi-coding
/// values (`gzip, br`) are left alone.
pub(crate) fn is_supported_encoding(value: &str) -> bool {
    matches!(value.trim(), "gzip" | "compress" | "deflate")
}

/// A byte stream that inflates its inner stream on the fly.
pub(crate) struct DecodeStream {
    inner: BoxStream,
    inflater: Inflater,
    done: bool,
}

enum Inflater {
    /// Holding the first bytes until the container format is known.
    Probing(Vec<u8>),
    Gzip(GzDecoder<Vec<u8>>),
    Zlib(ZlibDecoder<Vec<u8>>),
}

impl Inflater {
    fn write(&mut self, bytes: &[u8]) -> std::io::Result<Vec<u8>> {
        match self {
            // Callers replace Probing before writing.
            Inflater::Probing(_) => Ok(Vec::new()),
            Inflater::Gzip(d) => {
                d.write_all(bytes)?;
                Ok(std::mem::take(d.get_mut()))
            }
            Inflater::Zlib(d) => {
                d.write_all(bytes)?;
                Ok(std::mem::take(d.get_mut()))
            }
        }
    }
}

impl DecodeStream {
    pub(crate) fn new(inner: BoxStream) -> DecodeStream {
        DecodeStream {
            inner,
            inflater: Inflater::Probing(Vec::new()),
            done: false,
        }
    }

    /// Feed one compressed chunk, returning whatever plaintext it
    /// yielded. An empty return means the inflater needs more input.
    fn feed(&mut self, chunk: &[u8]) -> std::io::Result<Vec<u8>> {
        if let Inflater::Probing(buf) = &mut self.inflater {
            buf.extend_from_slice(chunk);
            if buf.len() < GZIP_MAGIC.len() {
                return Ok(Vec::new());
            }
            let pending = std::mem::take(buf);
            if pending[..2] == GZIP_MAGIC {
                trace!("content-encoding: gzip container detected");
                self.inflater = Inflater::Gzip(GzDecoder::new(Vec::new()));
            } else {
                trace!("content-encoding: zlib container assumed");
                self.inflater = Inflater::Zlib(ZlibDecoder::new(Vec::new()));
            }
            return self.inflater.write(&pending);
        }
        self.inflater.write(chunk)
    }

    /// Flush the inflater at end of stream.
    fn finish(&mut self) -> std::io::Result<Vec<u8>> {
        match std::mem::replace(&mut self.inflater, Inflater::Probing(Vec::new())) {
            Inflater::Probing(buf) => {
                if buf.is_empty() {
                    Ok(Vec::new())
                } else {
                    Err(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "compressed body ended before the container header",
                    ))
                }
            }
            Inflater::Gzip(d) => d.finish(),
            Inflater::Zlib(d) => d.finish(),
        }
    }
}

impl Stream for DecodeStream {
    type Item = Result<Bytes, BoxError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        loop {
            if this.done {
                return Poll::Ready(None);
            }
            let next = Pin::new(&mut this.inner).poll_next(cx);
            match next {
                Poll::Ready(Some(Ok(chunk))) => match this.feed(&chunk) {
                    // Header consumed, nothing decoded yet; poll again.
                    Ok(out) if out.is_empty() => continue,
                    Ok(out) => return Poll::Ready(Some(Ok(Bytes::from(out)))),
                    Err(e) => {
                        this.done = true;
                        return Poll::Ready(Some(Err(Box::new(e))));
                    }
                },
                Poll::Ready(Some(Err(e))) => {
                    this.done = true;
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(None) => {
                    this.done = true;
                    return match this.finish() {
                        Ok(out) if out.is_empty() => Poll::Ready(None),
                        Ok(out) => Poll::Ready(Some(Ok(Bytes::from(out)))),
                        Err(e) => Poll::Ready(Some(Err(Box::new(e)))),
                    };
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Decode body bytes to text per the configured `response_encoding`.
pub(crate) fn decode_text(data: &[u8], encoding: Option<&str>) -> String {
    let normalized = encoding.map(|e| e.trim().to_ascii_lowercase());
    match normalized.as_deref() {
        None | Some("utf-8" | "utf8") => String::from_utf8_lossy(data).into_owned(),
        Some("latin1" | "binary") => data.iter().map(|&b| b as char).collect(),
        Some("ascii") => data.iter().map(|&b| (b & 0x7F) as char).collect(),
        Some(_) => {
            warn!(
                encoding = encoding.unwrap_or_default(),
                "unknown response encoding, decoding as UTF-8"
            );
            String::from_utf8_lossy(data).into_owned()
        }
    }
}
