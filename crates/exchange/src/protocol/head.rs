//! Shared behaviour of request and response heads.
//!
//! A [`MessageHead`] is what a completed header parse leaves behind: the start line and
//! header fields of one message, plus the knowledge of how to turn itself into a full
//! `http` message once the body has been materialized.

use std::fmt;

use http::{HeaderMap, HeaderValue};
use tokio_util::codec::Decoder;

use crate::protocol::{ParseError, PayloadSize};

/// The head of an HTTP message, produced by a header decoder.
pub trait MessageHead: fmt::Debug + Send + Sized + 'static {
    /// The complete message this head becomes once a body is attached.
    type Message<B>;

    /// The decoder producing this head together with its payload framing.
    type Decoder: Decoder<Item = (Self, PayloadSize), Error = ParseError> + fmt::Debug + Send + 'static;

    fn headers(&self) -> &HeaderMap;

    /// Attaches a body, producing the final message.
    fn into_message<B>(self, body: B) -> Self::Message<B>;
}

/// Checks if the Transfer-Encoding header indicates chunked encoding.
///
/// According to RFC 9112, chunked must be the last encoding if present.
pub(crate) fn is_chunked(header_value: Option<&HeaderValue>) -> bool {
    const CHUNKED: &[u8] = b"chunked";
    if let Some(value) = header_value {
        if let Some(bytes) = value.as_bytes().rsplit(|b| *b == b',').next() {
            return bytes.trim_ascii().eq_ignore_ascii_case(CHUNKED);
        }
    }
    false
}

pub(crate) fn parse_content_length(value: &HeaderValue) -> Result<u64, ParseError> {
    let cl_str = value.to_str().map_err(|_e| ParseError::invalid_content_length("value can't to_str"))?;

    cl_str.trim().parse::<u64>().map_err(|_e| ParseError::invalid_content_length(format!("value {cl_str} is not u64")))
}
