//! Body materialization policies.
//!
//! A policy receives the decoded payload bytes of one message and turns them into the
//! body value of the final message. Policies never see framing bytes.

use std::fmt;

use bytes::{Bytes, BytesMut};
use futures::channel::mpsc::UnboundedSender;
use tracing::trace;

use crate::allocator::Allocator;
use crate::protocol::{ParseError, PayloadSize};

/// Upper bound of the storage reserved up front from an announced `Content-Length`.
const MAX_PREALLOCATE: u64 = 64 * 1024;

/// Strategy turning payload bytes into a body value.
pub trait BodyPolicy: fmt::Debug + Send + 'static {
    type Value: Send + 'static;

    /// Called once before the first byte, with the framing of the payload and the
    /// allocator of whoever receives the message.
    fn init<A: Allocator>(&mut self, payload_size: PayloadSize, allocator: &A) -> Result<(), ParseError>;

    fn put(&mut self, chunk: &[u8]) -> Result<(), ParseError>;

    fn finish(self) -> Result<Self::Value, ParseError>;
}

fn initial_capacity(payload_size: PayloadSize, limit: Option<u64>) -> usize {
    let hint = payload_size.exact().unwrap_or(0).min(MAX_PREALLOCATE);
    let hint = limit.map_or(hint, |limit| hint.min(limit));
    usize::try_from(hint).unwrap_or(0)
}

/// Accumulates the whole body into [`Bytes`].
#[derive(Debug, Default)]
pub struct BytesBody {
    limit: Option<u64>,
    buffer: BytesMut,
}

impl BytesBody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the read with [`ParseError::TooLargeBody`] once the body exceeds `limit` bytes.
    pub fn with_limit(limit: u64) -> Self {
        Self { limit: Some(limit), buffer: BytesMut::new() }
    }
}

impl BodyPolicy for BytesBody {
    type Value = Bytes;

    fn init<A: Allocator>(&mut self, payload_size: PayloadSize, allocator: &A) -> Result<(), ParseError> {
        if let (Some(length), Some(limit)) = (payload_size.exact(), self.limit) {
            if length > limit {
                return Err(ParseError::too_large_body(length, limit));
            }
        }
        self.buffer = allocator.allocate(initial_capacity(payload_size, self.limit));
        Ok(())
    }

    fn put(&mut self, chunk: &[u8]) -> Result<(), ParseError> {
        let size = (self.buffer.len() + chunk.len()) as u64;
        if let Some(limit) = self.limit {
            if size > limit {
                return Err(ParseError::too_large_body(size, limit));
            }
        }
        self.buffer.extend_from_slice(chunk);
        Ok(())
    }

    fn finish(self) -> Result<Bytes, ParseError> {
        Ok(self.buffer.freeze())
    }
}

/// Accumulates the body and validates it as UTF-8 once complete.
#[derive(Debug, Default)]
pub struct StringBody {
    inner: BytesBody,
}

impl StringBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: u64) -> Self {
        Self { inner: BytesBody::with_limit(limit) }
    }
}

impl BodyPolicy for StringBody {
    type Value = String;

    fn init<A: Allocator>(&mut self, payload_size: PayloadSize, allocator: &A) -> Result<(), ParseError> {
        self.inner.init(payload_size, allocator)
    }

    fn put(&mut self, chunk: &[u8]) -> Result<(), ParseError> {
        self.inner.put(chunk)
    }

    fn finish(self) -> Result<String, ParseError> {
        let bytes = self.inner.finish()?;
        String::from_utf8(bytes.to_vec()).map_err(|e| ParseError::invalid_body(e.utf8_error()))
    }
}

/// Reads the body into a buffer of fixed capacity, a larger body is a parse error.
#[derive(Debug)]
pub struct FixedBody {
    capacity: usize,
    buffer: BytesMut,
}

impl FixedBody {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, buffer: BytesMut::new() }
    }
}

impl BodyPolicy for FixedBody {
    type Value = Bytes;

    fn init<A: Allocator>(&mut self, payload_size: PayloadSize, allocator: &A) -> Result<(), ParseError> {
        let capacity = self.capacity as u64;
        if let Some(length) = payload_size.exact().filter(|length| *length > capacity) {
            return Err(ParseError::too_large_body(length, capacity));
        }
        self.buffer = allocator.allocate(self.capacity);
        Ok(())
    }

    fn put(&mut self, chunk: &[u8]) -> Result<(), ParseError> {
        let size = self.buffer.len() + chunk.len();
        if size > self.capacity {
            return Err(ParseError::too_large_body(size as u64, self.capacity as u64));
        }
        self.buffer.extend_from_slice(chunk);
        Ok(())
    }

    fn finish(self) -> Result<Bytes, ParseError> {
        Ok(self.buffer.freeze())
    }
}

/// Forwards every chunk of the body to a channel as it arrives.
///
/// The message body is the number of bytes forwarded. A dropped receiver fails the read.
pub struct SinkBody {
    sender: UnboundedSender<Bytes>,
    scratch: BytesMut,
    forwarded: u64,
}

impl SinkBody {
    pub fn new(sender: UnboundedSender<Bytes>) -> Self {
        Self { sender, scratch: BytesMut::new(), forwarded: 0 }
    }
}

impl fmt::Debug for SinkBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkBody").field("forwarded", &self.forwarded).finish_non_exhaustive()
    }
}

impl BodyPolicy for SinkBody {
    type Value = u64;

    fn init<A: Allocator>(&mut self, payload_size: PayloadSize, allocator: &A) -> Result<(), ParseError> {
        self.scratch = allocator.allocate(initial_capacity(payload_size, None));
        Ok(())
    }

    fn put(&mut self, chunk: &[u8]) -> Result<(), ParseError> {
        self.scratch.extend_from_slice(chunk);
        let bytes = self.scratch.split().freeze();
        trace!(len = bytes.len(), "forward body chunk");
        self.sender.unbounded_send(bytes).map_err(|_e| ParseError::invalid_body("body receiver dropped"))?;
        self.forwarded += chunk.len() as u64;
        Ok(())
    }

    fn finish(self) -> Result<u64, ParseError> {
        self.sender.close_channel();
        Ok(self.forwarded)
    }
}

/// Drops the body, keeping only its size.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardBody {
    discarded: u64,
}

impl BodyPolicy for DiscardBody {
    type Value = u64;

    fn init<A: Allocator>(&mut self, _payload_size: PayloadSize, _allocator: &A) -> Result<(), ParseError> {
        Ok(())
    }

    fn put(&mut self, chunk: &[u8]) -> Result<(), ParseError> {
        self.discarded += chunk.len() as u64;
        Ok(())
    }

    fn finish(self) -> Result<u64, ParseError> {
        Ok(self.discarded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::Global;
    use futures::StreamExt;
    use futures::channel::mpsc;

    #[test]
    fn bytes_body_limit() {
        let mut body = BytesBody::with_limit(4);
        assert!(matches!(body.init(PayloadSize::Length(5), &Global), Err(ParseError::TooLargeBody { .. })));

        let mut body = BytesBody::with_limit(4);
        body.init(PayloadSize::Chunked, &Global).unwrap();
        body.put(b"abc").unwrap();
        assert!(matches!(body.put(b"de"), Err(ParseError::TooLargeBody { current_size: 5, max_size: 4 })));
    }

    #[test]
    fn string_body_validates_utf8() {
        let mut body = StringBody::new();
        body.init(PayloadSize::Chunked, &Global).unwrap();
        body.put("héllo".as_bytes()).unwrap();
        assert_eq!(body.finish().unwrap(), "héllo");

        let mut body = StringBody::new();
        body.init(PayloadSize::Chunked, &Global).unwrap();
        body.put(&[0xff, 0xfe]).unwrap();
        assert!(matches!(body.finish(), Err(ParseError::InvalidBody { .. })));
    }

    #[test]
    fn fixed_body_overflow() {
        let mut body = FixedBody::new(4);
        body.init(PayloadSize::UntilClose, &Global).unwrap();
        body.put(b"1234").unwrap();
        assert!(body.put(b"5").is_err());
    }

    #[tokio::test]
    async fn sink_body_forwards_chunks() {
        let (sender, receiver) = mpsc::unbounded();
        let mut body = SinkBody::new(sender);
        body.init(PayloadSize::Chunked, &Global).unwrap();
        body.put(b"hello ").unwrap();
        body.put(b"world").unwrap();
        assert_eq!(body.finish().unwrap(), 11);

        let chunks: Vec<Bytes> = receiver.collect().await;
        assert_eq!(chunks, vec![Bytes::from_static(b"hello "), Bytes::from_static(b"world")]);
    }

    #[test]
    fn sink_body_fails_without_receiver() {
        let (sender, receiver) = mpsc::unbounded();
        drop(receiver);
        let mut body = SinkBody::new(sender);
        body.init(PayloadSize::Chunked, &Global).unwrap();
        assert!(body.put(b"x").is_err());
    }

    #[test]
    fn discard_body_counts() {
        let mut body = DiscardBody::default();
        body.init(PayloadSize::Length(3), &Global).unwrap();
        body.put(b"abc").unwrap();
        assert_eq!(body.finish().unwrap(), 3);
    }
}
