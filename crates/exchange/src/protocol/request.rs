//! HTTP request header handling implementation.
//!
//! This module provides the core abstractions for handling HTTP request headers.
//! It wraps the standard `http::Request` type to provide additional functionality
//! specific to the exchange engine.

use http::request::Parts;
use http::{HeaderMap, Method, Request, Uri, Version};

use crate::codec::RequestHeaderDecoder;
use crate::protocol::head::{is_chunked, parse_content_length};
use crate::protocol::{MessageHead, ParseError, PayloadSize};

/// Type alias for an outgoing request head, the body is attached by the writer.
pub type RequestHead = Request<()>;

/// Represents an HTTP request header.
///
/// This struct wraps a `http::Request<()>` to provide:
/// - Access to standard HTTP header fields
/// - Body attachment capabilities
/// - Payload framing inspection
#[derive(Debug)]
pub struct RequestHeader {
    inner: Request<()>,
}

impl AsRef<Request<()>> for RequestHeader {
    fn as_ref(&self) -> &Request<()> {
        &self.inner
    }
}

impl AsMut<Request<()>> for RequestHeader {
    fn as_mut(&mut self) -> &mut Request<()> {
        &mut self.inner
    }
}

impl RequestHeader {
    /// Consumes the header and returns the inner `Request<()>`.
    pub fn into_inner(self) -> Request<()> {
        self.inner
    }

    /// Attaches a body to this header, converting it into a full `Request<T>`.
    pub fn body<T>(self, body: T) -> Request<T> {
        self.inner.map(|_| body)
    }

    /// Returns a reference to the request's HTTP method.
    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    /// Returns a reference to the request's URI.
    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    /// Returns the request's HTTP version.
    pub fn version(&self) -> Version {
        self.inner.version()
    }

    /// Returns a reference to the request's headers.
    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Determines how the request body is framed, refer:
    /// <https://www.rfc-editor.org/rfc/rfc9112.html#name-message-body-length>
    ///
    /// Framing follows the headers for every method, so a `GET` that announces a
    /// body still has it consumed off the stream. A request never uses
    /// close-delimited framing: without `Content-Length` or `Transfer-Encoding`
    /// it carries no body.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if:
    /// - Both Content-Length and Transfer-Encoding headers are present
    /// - Content-Length value is invalid
    pub fn payload_size(&self) -> Result<PayloadSize, ParseError> {
        let te_header = self.headers().get(http::header::TRANSFER_ENCODING);
        let cl_header = self.headers().get(http::header::CONTENT_LENGTH);

        match (te_header, cl_header) {
            (None, None) => Ok(PayloadSize::new_empty()),

            (te_value @ Some(_), None) => {
                if is_chunked(te_value) {
                    Ok(PayloadSize::new_chunked())
                } else {
                    Ok(PayloadSize::new_empty())
                }
            }

            (None, Some(cl_value)) => Ok(PayloadSize::new_length(parse_content_length(cl_value)?)),

            (Some(_), Some(_)) => {
                Err(ParseError::invalid_content_length("transfer_encoding and content_length both present in headers"))
            }
        }
    }
}

impl MessageHead for RequestHeader {
    type Message<B> = Request<B>;
    type Decoder = RequestHeaderDecoder;

    fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    fn into_message<B>(self, body: B) -> Request<B> {
        self.body(body)
    }
}

/// Converts request parts into a RequestHeader.
impl From<Parts> for RequestHeader {
    #[inline]
    fn from(parts: Parts) -> Self {
        Self { inner: Request::from_parts(parts, ()) }
    }
}

/// Converts a bodyless request into a RequestHeader.
impl From<Request<()>> for RequestHeader {
    #[inline]
    fn from(inner: Request<()>) -> Self {
        Self { inner }
    }
}
