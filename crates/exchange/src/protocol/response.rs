//! HTTP response header handling implementation.
//!
//! [`ResponseHead`] is the outgoing form handed to the encoder, [`ResponseHeader`] is the
//! incoming form produced by the response header decoder.

use http::response::Parts;
use http::{HeaderMap, Response, StatusCode, Version};

use crate::codec::ResponseHeaderDecoder;
use crate::protocol::head::{is_chunked, parse_content_length};
use crate::protocol::{MessageHead, ParseError, PayloadSize};

/// Type alias for HTTP response headers.
///
/// This type represents the header portion of an HTTP response, using
/// `http::Response<()>` with an empty body placeholder. The actual response
/// body can be attached later using the response builder pattern.
pub type ResponseHead = Response<()>;

/// A parsed HTTP response header.
#[derive(Debug)]
pub struct ResponseHeader {
    inner: Response<()>,
}

impl ResponseHeader {
    pub fn into_inner(self) -> Response<()> {
        self.inner
    }

    pub fn body<T>(self, body: T) -> Response<T> {
        self.inner.map(|_| body)
    }

    pub fn status(&self) -> StatusCode {
        self.inner.status()
    }

    pub fn version(&self) -> Version {
        self.inner.version()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Determines how the response body is framed, refer:
    /// <https://www.rfc-editor.org/rfc/rfc9112.html#name-message-body-length>
    ///
    /// `head_request` tells whether the response answers a `HEAD` request, in which case
    /// there is never a body whatever the headers announce.
    pub fn payload_size(&self, head_request: bool) -> Result<PayloadSize, ParseError> {
        let status = self.status();
        if head_request
            || status.is_informational()
            || status == StatusCode::NO_CONTENT
            || status == StatusCode::NOT_MODIFIED
        {
            return Ok(PayloadSize::new_empty());
        }

        let te_header = self.headers().get(http::header::TRANSFER_ENCODING);
        let cl_header = self.headers().get(http::header::CONTENT_LENGTH);

        match (te_header, cl_header) {
            // transfer-encoding overrides content-length in a response
            (te_value @ Some(_), _) => {
                if is_chunked(te_value) {
                    Ok(PayloadSize::new_chunked())
                } else {
                    Ok(PayloadSize::UntilClose)
                }
            }
            (None, Some(cl_value)) => Ok(PayloadSize::new_length(parse_content_length(cl_value)?)),
            (None, None) => Ok(PayloadSize::UntilClose),
        }
    }
}

impl MessageHead for ResponseHeader {
    type Message<B> = Response<B>;
    type Decoder = ResponseHeaderDecoder;

    fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    fn into_message<B>(self, body: B) -> Response<B> {
        self.body(body)
    }
}

impl From<Parts> for ResponseHeader {
    #[inline]
    fn from(parts: Parts) -> Self {
        Self { inner: Response::from_parts(parts, ()) }
    }
}

impl From<Response<()>> for ResponseHeader {
    #[inline]
    fn from(inner: Response<()>) -> Self {
        Self { inner }
    }
}
