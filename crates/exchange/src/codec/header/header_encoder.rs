//! HTTP header encoder implementation for serializing request and response heads
//!
//! This module encodes message heads into raw bytes. It writes the start line (request line or
//! status line) and the header fields, and manages the `Content-Length` or `Transfer-Encoding`
//! header according to the payload framing of the message.

use std::io;
use std::io::{ErrorKind, Write};

use bytes::{BufMut, BytesMut};
use http::{HeaderMap, HeaderValue, Version, header};
use tokio_util::codec::Encoder;
use tracing::error;

use crate::protocol::{PayloadSize, RequestHead, ResponseHead, SendError};

/// Initial buffer size allocated for header serialization
const INIT_HEADER_SIZE: usize = 4 * 1024;

/// Encoder for HTTP message heads implementing the [`Encoder`] trait.
///
/// This encoder serializes a [`ResponseHead`] or [`RequestHead`] together with its
/// [`PayloadSize`] into raw bytes, setting Content-Length or Transfer-Encoding to
/// match the payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderEncoder;

impl Encoder<(ResponseHead, PayloadSize)> for HeaderEncoder {
    type Error = SendError;

    fn encode(&mut self, item: (ResponseHead, PayloadSize), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (mut header, payload_size) = item;

        dst.reserve(INIT_HEADER_SIZE);
        let version = version_str(header.version())?;
        write!(
            FastWrite(dst),
            "{} {} {}\r\n",
            version,
            header.status().as_str(),
            header.status().canonical_reason().unwrap_or("")
        )?;

        set_framing(header.headers_mut(), payload_size, true);
        write_headers(header.headers(), dst);
        Ok(())
    }
}

impl Encoder<(RequestHead, PayloadSize)> for HeaderEncoder {
    type Error = SendError;

    fn encode(&mut self, item: (RequestHead, PayloadSize), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (mut header, payload_size) = item;

        dst.reserve(INIT_HEADER_SIZE);
        let version = version_str(header.version())?;
        let target = header.uri().path_and_query().map_or("/", |path| path.as_str());
        write!(FastWrite(dst), "{} {} {}\r\n", header.method().as_str(), target, version)?;

        // absolute-form uri: move the authority into the Host header
        if !header.headers().contains_key(header::HOST) {
            if let Some(authority) = header.uri().authority() {
                let host = HeaderValue::from_str(authority.as_str())
                    .map_err(|e| SendError::io(io::Error::new(ErrorKind::InvalidInput, e)))?;
                header.headers_mut().insert(header::HOST, host);
            }
        }

        set_framing(header.headers_mut(), payload_size, false);
        write_headers(header.headers(), dst);
        Ok(())
    }
}

fn version_str(version: Version) -> Result<&'static str, SendError> {
    match version {
        Version::HTTP_11 => Ok("HTTP/1.1"),
        Version::HTTP_10 => Ok("HTTP/1.0"),
        v => {
            error!(http_version = ?v, "unsupported http version");
            Err(io::Error::from(ErrorKind::Unsupported).into())
        }
    }
}

/// Set appropriate content length or transfer encoding header.
///
/// An empty response still announces `Content-Length: 0` so the peer never waits for
/// a close, an empty request simply carries no framing header.
fn set_framing(headers: &mut HeaderMap, payload_size: PayloadSize, announce_empty: bool) {
    const CHUNKED_VALUE: HeaderValue = HeaderValue::from_static("chunked");
    const ZERO_VALUE: HeaderValue = HeaderValue::from_static("0");

    match payload_size {
        PayloadSize::Length(n) => {
            headers.remove(header::TRANSFER_ENCODING);
            headers.insert(header::CONTENT_LENGTH, n.into());
        }
        PayloadSize::Chunked => {
            headers.remove(header::CONTENT_LENGTH);
            headers.insert(header::TRANSFER_ENCODING, CHUNKED_VALUE);
        }
        PayloadSize::Empty if announce_empty => {
            headers.insert(header::CONTENT_LENGTH, ZERO_VALUE);
        }
        PayloadSize::Empty | PayloadSize::UntilClose => {}
    }
}

fn write_headers(headers: &HeaderMap, dst: &mut BytesMut) {
    for (header_name, header_value) in headers.iter() {
        dst.put_slice(header_name.as_ref());
        dst.put_slice(b": ");
        dst.put_slice(header_value.as_ref());
        dst.put_slice(b"\r\n");
    }
    dst.put_slice(b"\r\n");
}

/// Fast writer implementation for writing to BytesMut.
///
/// This is an optimization to avoid unnecessary bounds checking when writing
/// to the bytes buffer, since we've already reserved enough space.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
