//! The composed body read.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::{Buf, BytesMut};
use tokio::io::AsyncRead;
use tracing::{debug, trace};

use crate::deadline::Deadline;
use crate::op::Halt;
use crate::parser::{BodyParser, BodyPolicy};
use crate::protocol::{ExchangeError, MessageHead, ParseError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Not polled yet, the first poll only yields.
    Init,
    /// Decide whether the message is finished, otherwise arm the deadline.
    Arm,
    /// A read is in flight.
    Read,
    Finished,
}

/// Reads the body of a message whose head has already been parsed.
///
/// The operation owns the body parser and borrows the stream, the read buffer and the
/// deadline shared with the stream. Each step arms the deadline for one read, reads
/// whatever is available, feeds it to the parser and drops the bytes the parser consumed
/// from the buffer, failed step or not. It resolves exactly once:
///
/// - with the message once the parser reports it complete,
/// - with the message as received so far if the peer closes first,
/// - with the error of the first failed read or parse otherwise.
///
/// The first poll always returns [`Poll::Pending`] after waking the task, so the
/// operation never completes within the poll that started it.
#[derive(Debug)]
#[must_use = "futures do nothing unless polled"]
pub struct ReadBody<'a, S, H: MessageHead, B: BodyPolicy> {
    stream: &'a mut S,
    buffer: &'a mut BytesMut,
    deadline: &'a Deadline,
    read_timeout: Duration,
    read_capacity: usize,
    parser: Option<BodyParser<H, B>>,
    halt: Option<Halt>,
    feed_buffered: bool,
    state: State,
}

impl<'a, S, H, B> ReadBody<'a, S, H, B>
where
    S: AsyncRead + Unpin,
    H: MessageHead,
    B: BodyPolicy,
{
    /// Creates the operation, a parser that failed to build is reported as the result.
    pub fn new(
        stream: &'a mut S,
        buffer: &'a mut BytesMut,
        deadline: &'a Deadline,
        read_timeout: Duration,
        read_capacity: usize,
        parser: Result<BodyParser<H, B>, ParseError>,
    ) -> Self {
        let (parser, halt) = match parser {
            Ok(parser) => (Some(parser), None),
            Err(e) => (None, Some(Halt::Failed(e.into()))),
        };

        Self {
            stream,
            buffer,
            deadline,
            read_timeout,
            read_capacity: read_capacity.max(1),
            parser,
            halt,
            feed_buffered: true,
            state: State::Init,
        }
    }

    fn finish(&mut self, result: Result<H::Message<B::Value>, ExchangeError>) -> Poll<<Self as Future>::Output> {
        self.state = State::Finished;
        self.deadline.disarm();
        match &result {
            Ok(_) => debug!(buffered = self.buffer.len(), "body read complete"),
            Err(e) => debug!(cause = %e, buffered = self.buffer.len(), "body read failed"),
        }
        Poll::Ready(result)
    }

    /// Feeds the whole buffer to the parser and drops the consumed prefix.
    fn feed(&mut self) {
        let Some(parser) = self.parser.as_mut() else {
            return;
        };

        let (consumed, result) = parser.feed(&self.buffer[..]);
        self.buffer.advance(consumed);
        trace!(consumed, remaining = self.buffer.len(), "fed body parser");

        if let Err(e) = result {
            self.halt = Some(Halt::Failed(e.into()));
        }
    }
}

// no field is ever pinned
impl<S, H: MessageHead, B: BodyPolicy> Unpin for ReadBody<'_, S, H, B> {}

impl<S, H, B> Future for ReadBody<'_, S, H, B>
where
    S: AsyncRead + Unpin,
    H: MessageHead,
    B: BodyPolicy,
{
    type Output = Result<H::Message<B::Value>, ExchangeError>;

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
                    let Some(parser) = this.parser.as_mut() else {
                        let error = match this.halt.take() {
                            Some(Halt::Failed(e)) => e,
                            _ => ParseError::HeaderIncomplete.into(),
                        };
                        return this.finish(Err(error));
                    };

                    // a complete message wins over whatever the last read reported
                    if !parser.is_done() {
                        match this.halt.take() {
                            Some(Halt::Failed(e)) => return this.finish(Err(e)),
                            Some(Halt::Eof) => parser.finish_eof(),
                            None => {}
                        }
                    }

                    if parser.is_done() {
                        let result = match this.parser.take() {
                            Some(parser) => parser.release().map_err(ExchangeError::from),
                            None => Err(ParseError::HeaderIncomplete.into()),
                        };
                        return this.finish(result);
                    }

                    this.deadline.arm(this.read_timeout);
                    this.state = State::Read;
                }

                State::Read => {
                    if std::mem::take(&mut this.feed_buffered) && !this.buffer.is_empty() {
                        trace!(buffered = this.buffer.len(), "feed bytes buffered before the read");
                        this.feed();
                        this.state = State::Arm;
                        continue;
                    }

                    this.buffer.reserve(this.read_capacity);
                    match tokio_util::io::poll_read_buf(Pin::new(&mut *this.stream), cx, this.buffer) {
                        Poll::Pending => return Poll::Pending,
                        Poll::Ready(Ok(0)) => {
                            debug!("peer closed the stream");
                            this.halt = Some(Halt::Eof);
                        }
                        Poll::Ready(Ok(n)) => {
                            trace!(read = n, "read body bytes");
                            this.feed();
                        }
                        Poll::Ready(Err(e)) => {
                            this.halt = Some(Halt::Failed(ExchangeError::from_io(e)));
                        }
                    }
                    this.state = State::Arm;
                }

                State::Finished => panic!("`ReadBody` polled after completion"),
            }
        }
    }
}
