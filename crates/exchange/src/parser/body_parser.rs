//! Incremental parse of a message body, consuming a completed header parse.

use tracing::{trace, warn};

use crate::allocator::Allocator;
use crate::codec::PayloadDecoder;
use crate::parser::{BodyPolicy, HeaderParser};
use crate::protocol::{MessageHead, ParseError, PayloadItem, PayloadSize};

/// Message parser fed with the bytes following a complete head.
///
/// [`feed`](Self::feed) reports how many bytes it took, the caller removes exactly that
/// many from its buffer. [`release`](Self::release) turns the parser into the final message.
#[derive(Debug)]
pub struct BodyParser<H: MessageHead, B: BodyPolicy> {
    header: H,
    payload_size: PayloadSize,
    decoder: PayloadDecoder,
    body: B,
    received: u64,
    max_body_bytes: Option<u64>,
    done: bool,
}

impl<H: MessageHead, B: BodyPolicy> BodyParser<H, B> {
    /// Takes over the head of a completed header parse, body storage comes from `allocator`.
    ///
    /// Fails with [`ParseError::HeaderIncomplete`] if the head is not complete, and with
    /// [`ParseError::TooLargeBody`] if the announced length exceeds the configured maximum.
    pub fn new<A: Allocator>(header: HeaderParser<H>, mut body: B, allocator: &A) -> Result<Self, ParseError> {
        let max_body_bytes = header.max_body_bytes();
        let (header, payload_size) = header.into_parts()?;

        if let (Some(length), Some(max)) = (payload_size.exact(), max_body_bytes) {
            if length > max {
                return Err(ParseError::too_large_body(length, max));
            }
        }

        body.init(payload_size, allocator)?;

        Ok(Self {
            header,
            payload_size,
            decoder: PayloadDecoder::from(payload_size),
            body,
            received: 0,
            max_body_bytes,
            done: payload_size.is_empty(),
        })
    }

    pub fn header(&self) -> &H {
        &self.header
    }

    pub fn payload_size(&self) -> PayloadSize {
        self.payload_size
    }

    /// Payload bytes handed to the body policy so far.
    pub fn received(&self) -> u64 {
        self.received
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Parses as much of `bytes` as possible.
    ///
    /// Returns the number of bytes consumed together with the outcome. The count is
    /// meaningful on failure too: bytes consumed before the error must still be dropped
    /// from the caller's buffer.
    pub fn feed(&mut self, bytes: &[u8]) -> (usize, Result<(), ParseError>) {
        let mut src = bytes;
        let result = self.feed_slice(&mut src);
        (bytes.len() - src.len(), result)
    }

    fn feed_slice(&mut self, src: &mut &[u8]) -> Result<(), ParseError> {
        while !self.done {
            match self.decoder.decode(src)? {
                Some(PayloadItem::Chunk(chunk)) => {
                    self.received += chunk.len() as u64;
                    if let Some(max) = self.max_body_bytes.filter(|max| self.received > *max) {
                        return Err(ParseError::too_large_body(self.received, max));
                    }
                    trace!(len = chunk.len(), received = self.received, "parsed body bytes");
                    self.body.put(chunk)?;
                }
                Some(PayloadItem::Eof) => {
                    trace!(received = self.received, "body complete");
                    self.done = true;
                }
                None => break,
            }
        }
        Ok(())
    }

    /// Ends the message at end-of-stream.
    ///
    /// A close-delimited body is complete by definition. A length-delimited or chunked
    /// body cut short by the peer is accepted as well, with a warning.
    pub fn finish_eof(&mut self) {
        if self.done {
            return;
        }

        if !self.decoder.is_close_delimited() {
            warn!(
                payload_size = ?self.payload_size,
                received = self.received,
                "peer closed before the body was complete, accepting truncated body"
            );
        }
        self.done = true;
    }

    /// Consumes the parser into the final message.
    pub fn release(self) -> Result<H::Message<B::Value>, ParseError> {
        if !self.done {
            return Err(ParseError::invalid_body("message body is not complete"));
        }

        let body = self.body.finish()?;
        Ok(self.header.into_message(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::Global;
    use crate::config::ExchangeConfig;
    use crate::parser::{BytesBody, StringBody};
    use crate::protocol::RequestHeader;
    use bytes::BytesMut;
    use http::Method;

    fn request_parser(raw: &[u8], config: &ExchangeConfig) -> (HeaderParser<RequestHeader>, BytesMut) {
        let mut buffer = BytesMut::from(raw);
        let mut parser = HeaderParser::request(config);
        assert!(parser.feed(&mut buffer).unwrap());
        (parser, buffer)
    }

    #[test]
    fn length_body_in_pieces() {
        let (header, _) = request_parser(b"POST / HTTP/1.1\r\nContent-Length: 11\r\n\r\n", &ExchangeConfig::default());
        let mut parser = BodyParser::new(header, StringBody::new(), &Global).unwrap();

        let (consumed, result) = parser.feed(b"hello ");
        assert_eq!(consumed, 6);
        assert!(result.is_ok());
        assert!(!parser.is_done());

        let (consumed, result) = parser.feed(b"worldGET / HTTP/1.1\r\n");
        assert_eq!(consumed, 5);
        assert!(result.is_ok());
        assert!(parser.is_done());

        let request = parser.release().unwrap();
        assert_eq!(request.method(), &Method::POST);
        assert_eq!(request.body(), "hello world");
    }

    #[test]
    fn chunked_body_reports_consumed_on_error() {
        let (header, _) =
            request_parser(b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n", &ExchangeConfig::default());
        let mut parser = BodyParser::new(header, BytesBody::new(), &Global).unwrap();

        let (consumed, result) = parser.feed(b"3\r\nabc\r\nzz");
        assert_eq!(consumed, 9);
        assert!(matches!(result, Err(ParseError::InvalidChunk { .. })));
    }

    #[test]
    fn empty_body_is_done_immediately() {
        let (header, _) = request_parser(b"GET / HTTP/1.1\r\n\r\n", &ExchangeConfig::default());
        let parser = BodyParser::new(header, BytesBody::new(), &Global).unwrap();

        assert!(parser.is_done());
        assert!(parser.release().unwrap().body().is_empty());
    }

    #[test]
    fn incomplete_header_is_rejected() {
        let header = HeaderParser::request(&ExchangeConfig::default());
        let result = BodyParser::new(header, BytesBody::new(), &Global);
        assert!(matches!(result, Err(ParseError::HeaderIncomplete)));
    }

    #[test]
    fn announced_length_over_max() {
        let config = ExchangeConfig::default().with_max_body_bytes(Some(4));
        let (header, _) = request_parser(b"POST / HTTP/1.1\r\nContent-Length: 5\r\n\r\n", &config);
        let result = BodyParser::new(header, BytesBody::new(), &Global);
        assert!(matches!(result, Err(ParseError::TooLargeBody { current_size: 5, max_size: 4 })));
    }

    #[test]
    fn close_delimited_body_ends_at_eof() {
        let mut buffer = BytesMut::from(&b"HTTP/1.1 200 OK\r\n\r\n"[..]);
        let mut header = HeaderParser::response(&ExchangeConfig::default(), &Method::GET);
        assert!(header.feed(&mut buffer).unwrap());

        let mut parser = BodyParser::new(header, StringBody::new(), &Global).unwrap();
        assert_eq!(parser.payload_size(), PayloadSize::UntilClose);

        let (consumed, result) = parser.feed(b"abc");
        assert_eq!(consumed, 3);
        assert!(result.is_ok());
        assert!(!parser.is_done());

        parser.finish_eof();
        let response = parser.release().unwrap();
        assert_eq!(response.body(), "abc");
    }

    #[test]
    fn release_before_done_fails() {
        let (header, _) = request_parser(b"POST / HTTP/1.1\r\nContent-Length: 3\r\n\r\n", &ExchangeConfig::default());
        let parser = BodyParser::<RequestHeader, _>::new(header, BytesBody::new(), &Global).unwrap();
        assert!(parser.release().is_err());
    }
}
