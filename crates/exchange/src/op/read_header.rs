//! The composed header read.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::AsyncRead;
use tracing::{debug, trace};

use crate::deadline::Deadline;
use crate::op::Halt;
use crate::parser::HeaderParser;
use crate::protocol::{ExchangeError, MessageHead, ParseError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Init,
    Arm,
    Read,
    Finished,
}

/// Reads a message head, resolving to the completed [`HeaderParser`].
///
/// Runs the same loop as [`ReadBody`](crate::op::ReadBody): one deferred first poll, then
/// a deadline armed before every read. The head bytes are removed from the buffer once
/// complete, the bytes after them stay for the body.
///
/// A peer closing before sending anything resolves to [`ExchangeError::ConnectionClosed`],
/// closing in the middle of a head to [`ParseError::UnexpectedEof`].
#[derive(Debug)]
#[must_use = "futures do nothing unless polled"]
pub struct ReadHeader<'a, S, H: MessageHead> {
    stream: &'a mut S,
    buffer: &'a mut BytesMut,
    deadline: &'a Deadline,
    read_timeout: Duration,
    read_capacity: usize,
    parser: Option<HeaderParser<H>>,
    halt: Option<Halt>,
    feed_buffered: bool,
    state: State,
}

impl<'a, S, H> ReadHeader<'a, S, H>
where
    S: AsyncRead + Unpin,
    H: MessageHead,
{
    pub fn new(
        stream: &'a mut S,
        buffer: &'a mut BytesMut,
        deadline: &'a Deadline,
        read_timeout: Duration,
        read_capacity: usize,
        parser: HeaderParser<H>,
    ) -> Self {
        Self {
            stream,
            buffer,
            deadline,
            read_timeout,
            read_capacity: read_capacity.max(1),
            parser: Some(parser),
            halt: None,
            feed_buffered: true,
            state: State::Init,
        }
    }

    fn finish(&mut self, result: Result<HeaderParser<H>, ExchangeError>) -> Poll<<Self as Future>::Output> {
        self.state = State::Finished;
        self.deadline.disarm();
        if let Err(e) = &result {
            debug!(cause = %e, buffered = self.buffer.len(), "header read failed");
        }
        Poll::Ready(result)
    }

    fn feed(&mut self) {
        let Some(parser) = self.parser.as_mut() else {
            return;
        };

        match parser.feed(self.buffer) {
            Ok(true) => trace!(remaining = self.buffer.len(), "header complete"),
            Ok(false) => trace!(buffered = self.buffer.len(), "header incomplete"),
            Err(e) => self.halt = Some(Halt::Failed(e.into())),
        }
    }
}

// no field is ever pinned
impl<S, H: MessageHead> Unpin for ReadHeader<'_, S, H> {}

impl<S, H> Future for ReadHeader<'_, S, H>
where
    S: AsyncRead + Unpin,
    H: MessageHead,
{
    type Output = Result<HeaderParser<H>, ExchangeError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        loop {
            match this.state {
                State::Init => {
                    this.state = State::Arm;
                    cx.waker().wake_by_ref();
                    return Poll::Pending;
                }

                State::Arm => {
                    if this.parser.as_ref().is_some_and(HeaderParser::is_done) {
                        let result = this.parser.take().ok_or_else(|| ParseError::HeaderIncomplete.into());
                        return this.finish(result);
                    }

                    match this.halt.take() {
                        Some(Halt::Failed(e)) => return this.finish(Err(e)),
                        Some(Halt::Eof) if this.buffer.is_empty() => {
                            return this.finish(Err(ExchangeError::ConnectionClosed));
                        }
                        Some(Halt::Eof) => return this.finish(Err(ParseError::UnexpectedEof.into())),
                        None => {}
                    }

                    this.deadline.arm(this.read_timeout);
                    this.state = State::Read;
                }

                State::Read => {
                    if std::mem::take(&mut this.feed_buffered) && !this.buffer.is_empty() {
                        this.feed();
                        this.state = State::Arm;
                        continue;
                    }

                    this.buffer.reserve(this.read_capacity);
                    match tokio_util::io::poll_read_buf(Pin::new(&mut *this.stream), cx, this.buffer) {
                        Poll::Pending => return Poll::Pending,
                        Poll::Ready(Ok(0)) => {
                            debug!(buffered = this.buffer.len(), "peer closed the stream");
                            this.halt = Some(Halt::Eof);
                        }
                        Poll::Ready(Ok(n)) => {
                            trace!(read = n, "read header bytes");
                            this.feed();
                        }
                        Poll::Ready(Err(e)) => {
                            this.halt = Some(Halt::Failed(ExchangeError::from_io(e)));
                        }
                    }
                    this.state = State::Arm;
                }

                State::Finished => panic!("`ReadHeader` polled after completion"),
            }
        }
    }
}
