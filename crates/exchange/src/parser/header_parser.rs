//! Incremental parse of a message head.

use bytes::BytesMut;
use http::Method;
use tokio_util::codec::Decoder;

use crate::codec::{HeaderLimits, RequestHeaderDecoder, ResponseHeaderDecoder};
use crate::config::ExchangeConfig;
use crate::protocol::{MessageHead, ParseError, PayloadSize, RequestHeader, ResponseHeader};

/// Header-parse state of one message.
///
/// Bytes are offered with [`feed`](Self::feed) until the head is complete. A completed
/// parser is consumed by a [`BodyParser`](crate::parser::BodyParser) to read the body.
#[derive(Debug)]
pub struct HeaderParser<H: MessageHead> {
    decoder: H::Decoder,
    parsed: Option<(H, PayloadSize)>,
    max_body_bytes: Option<u64>,
}

impl HeaderParser<RequestHeader> {
    /// A parser for a request head.
    pub fn request(config: &ExchangeConfig) -> Self {
        Self::with_decoder(RequestHeaderDecoder::new(HeaderLimits::from(config)), config.max_body_bytes)
    }
}

impl HeaderParser<ResponseHeader> {
    /// A parser for the response to a request made with `method`.
    ///
    /// The method matters: a response to `HEAD` never carries a body, whatever its
    /// headers announce.
    pub fn response(config: &ExchangeConfig, method: &Method) -> Self {
        let decoder = ResponseHeaderDecoder::new(HeaderLimits::from(config), *method == Method::HEAD);
        Self::with_decoder(decoder, config.max_body_bytes)
    }
}

impl<H: MessageHead> HeaderParser<H> {
    pub fn with_decoder(decoder: H::Decoder, max_body_bytes: Option<u64>) -> Self {
        Self { decoder, parsed: None, max_body_bytes }
    }

    /// Offers the buffered bytes to the parser and returns whether the head is complete.
    ///
    /// Once the head is complete its bytes are removed from `buffer`, whatever follows
    /// stays for the body. An incomplete head is left in place and parsed again on the
    /// next call.
    pub fn feed(&mut self, buffer: &mut BytesMut) -> Result<bool, ParseError> {
        if self.parsed.is_some() {
            return Ok(true);
        }

        match self.decoder.decode(buffer)? {
            Some(parsed) => {
                self.parsed = Some(parsed);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        self.parsed.is_some()
    }

    pub fn header(&self) -> Option<&H> {
        self.parsed.as_ref().map(|(header, _)| header)
    }

    pub fn header_mut(&mut self) -> Option<&mut H> {
        self.parsed.as_mut().map(|(header, _)| header)
    }

    pub fn payload_size(&self) -> Option<PayloadSize> {
        self.parsed.as_ref().map(|(_, payload_size)| *payload_size)
    }

    pub(crate) fn max_body_bytes(&self) -> Option<u64> {
        self.max_body_bytes
    }

    /// Hands out the parsed head, failing with [`ParseError::HeaderIncomplete`] when the
    /// head was not complete yet.
    pub fn into_parts(self) -> Result<(H, PayloadSize), ParseError> {
        self.parsed.ok_or(ParseError::HeaderIncomplete)
    }
}
