//! A connection ready to exchange messages.

use std::fmt;
use std::sync::Arc;

use bytes::BytesMut;
use http::Method;
use tokio::io::AsyncRead;
use tokio::runtime::Handle;

use crate::allocator::{Allocator, Global};
use crate::config::ExchangeConfig;
use crate::deadline::{Deadline, TimedStream};
use crate::exec::Executor;
use crate::op::{ReadBody, ReadHeader};
use crate::parser::{BodyParser, BodyPolicy, HeaderParser};
use crate::protocol::{MessageHead, RequestHeader, ResponseHeader};

/// Everything the operations of one connection share: the stream, the read buffer, the
/// deadline the stream observes, the stream's own executor and the configuration.
///
/// Operations borrow the session for their whole run. The continuation-passing entry
/// points take it by value and hand it back with the result, so the connection can be
/// used for the next exchange.
pub struct Session<S> {
    stream: TimedStream<S>,
    buffer: BytesMut,
    deadline: Deadline,
    executor: Arc<dyn Executor>,
    config: ExchangeConfig,
}

impl<S> Session<S> {
    /// Creates a session with the default configuration, running on the current runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime.
    pub fn new(stream: S) -> Self {
        Self::with_config(stream, ExchangeConfig::default())
    }

    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime.
    pub fn with_config(stream: S, config: ExchangeConfig) -> Self {
        let deadline = Deadline::new();
        Self {
            stream: TimedStream::new(stream, deadline.clone()),
            buffer: BytesMut::with_capacity(config.read_buffer_capacity),
            deadline,
            executor: Arc::new(Handle::current()),
            config,
        }
    }

    /// Replaces the executor completions fall back to when they have none of their own.
    #[must_use]
    pub fn with_executor<E: Executor>(mut self, executor: E) -> Self {
        self.executor = Arc::new(executor);
        self
    }

    pub fn stream(&self) -> &TimedStream<S> {
        &self.stream
    }

    pub fn stream_mut(&mut self) -> &mut TimedStream<S> {
        &mut self.stream
    }

    pub fn buffer(&self) -> &BytesMut {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut BytesMut {
        &mut self.buffer
    }

    pub fn deadline(&self) -> &Deadline {
        &self.deadline
    }

    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    pub fn executor(&self) -> Arc<dyn Executor> {
        Arc::clone(&self.executor)
    }

    /// Gives back the stream together with the bytes read but not consumed yet.
    pub fn into_parts(self) -> (S, BytesMut) {
        (self.stream.into_inner(), self.buffer)
    }
}

impl<S: AsyncRead + Unpin> Session<S> {
    /// A parser for the next request head, configured from this session.
    pub fn request_parser(&self) -> HeaderParser<RequestHeader> {
        HeaderParser::request(&self.config)
    }

    /// A parser for the response to a request made with `method`.
    pub fn response_parser(&self, method: &Method) -> HeaderParser<ResponseHeader> {
        HeaderParser::response(&self.config, method)
    }

    /// Reads a message head into `parser`.
    pub fn read_header<H: MessageHead>(&mut self, parser: HeaderParser<H>) -> ReadHeader<'_, TimedStream<S>, H> {
        ReadHeader::new(
            &mut self.stream,
            &mut self.buffer,
            &self.deadline,
            self.config.read_timeout,
            self.config.read_buffer_capacity,
            parser,
        )
    }

    /// Reads the body following the head parsed by `header`, storing it with the global allocator.
    pub fn read_body<H: MessageHead, B: BodyPolicy>(
        &mut self,
        header: HeaderParser<H>,
        body: B,
    ) -> ReadBody<'_, TimedStream<S>, H, B> {
        self.read_body_in(header, body, &Global)
    }

    /// Reads the body following the head parsed by `header`, storing it with `allocator`.
    pub fn read_body_in<H: MessageHead, B: BodyPolicy, A: Allocator>(
        &mut self,
        header: HeaderParser<H>,
        body: B,
        allocator: &A,
    ) -> ReadBody<'_, TimedStream<S>, H, B> {
        let parser = BodyParser::new(header, body, allocator);
        ReadBody::new(
            &mut self.stream,
            &mut self.buffer,
            &self.deadline,
            self.config.read_timeout,
            self.config.read_buffer_capacity,
            parser,
        )
    }
}

impl<S: fmt::Debug> fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("stream", &self.stream)
            .field("buffered", &self.buffer.len())
            .field("deadline", &self.deadline)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
