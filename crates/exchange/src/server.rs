//! The server side of an exchange: read a request, write a response.

use std::fmt::Display;

use http::header::EXPECT;
use http::{Request, Response};
use http_body::Body;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

use crate::allocator::{Allocator, Global};
use crate::exec::Completion;
use crate::op::launch;
use crate::parser::{BodyPolicy, HeaderParser};
use crate::protocol::{ExchangeError, RequestHeader, ResponseHead, SendError};
use crate::session::Session;
use crate::writer::MessageWriter;

/// What [`async_read_request`] delivers.
pub type ReadRequestOutcome<S, B> = (Result<Request<<B as BodyPolicy>::Value>, ExchangeError>, Session<S>);

/// Reads the next request from `session`, materializing its body with `body`.
///
/// A request announcing `Expect: 100-continue` and carrying a body is answered with
/// `100 Continue` before the body is read.
///
/// A peer closing the connection between two requests yields
/// [`ExchangeError::ConnectionClosed`].
pub async fn read_request<S, B>(session: &mut Session<S>, body: B) -> Result<Request<B::Value>, ExchangeError>
where
    S: AsyncRead + AsyncWrite + Unpin,
    B: BodyPolicy,
{
    read_request_in(session, body, &Global).await
}

/// Like [`read_request`], storing the request body with `allocator`.
pub async fn read_request_in<S, B, A>(
    session: &mut Session<S>,
    body: B,
    allocator: &A,
) -> Result<Request<B::Value>, ExchangeError>
where
    S: AsyncRead + AsyncWrite + Unpin,
    B: BodyPolicy,
    A: Allocator,
{
    let parser = session.request_parser();
    let header = session.read_header(parser).await?;

    if expects_continue(&header) {
        let stream = session.stream_mut();
        stream.write_all(b"HTTP/1.1 100 Continue\r\n\r\n").await.map_err(SendError::io)?;
        stream.flush().await.map_err(SendError::io)?;
        info!("receive expect request header, sent continue response");
    }

    session.read_body_in(header, body, allocator).await
}

fn expects_continue(parser: &HeaderParser<RequestHeader>) -> bool {
    let has_body = parser.payload_size().is_some_and(|payload_size| !payload_size.is_empty());
    let expect = parser.header().and_then(|header| header.headers().get(EXPECT));

    has_body && expect.is_some_and(|value| value.as_bytes().eq_ignore_ascii_case(b"100-continue"))
}

/// Writes `response` in full and flushes it.
pub async fn write_response<S, T>(session: &mut Session<S>, response: Response<T>) -> Result<(), ExchangeError>
where
    S: AsyncWrite + Unpin,
    T: Body + Unpin,
    T::Error: Display,
{
    let (parts, body) = response.into_parts();
    debug!(status = %parts.status, "send response");

    MessageWriter::new(session.stream_mut()).send(ResponseHead::from_parts(parts, ()), body).await?;
    Ok(())
}

/// Starts [`read_request`] on the session's executor, delivering `(result, session)` to
/// `completion` on its executor, or the session's when the completion has none.
///
/// The request body is stored with the allocator of `completion`.
pub fn async_read_request<S, B, C>(mut session: Session<S>, body: B, completion: C)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    B: BodyPolicy,
    C: Completion<ReadRequestOutcome<S, B>>,
{
    let allocator = completion.allocator();

    launch(session.executor(), completion, async move {
        let result = read_request_in(&mut session, body, &allocator).await;
        (result, session)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExchangeConfig;
    use bytes::BytesMut;

    fn parsed(raw: &[u8]) -> HeaderParser<RequestHeader> {
        let mut parser = HeaderParser::request(&ExchangeConfig::default());
        let mut buffer = BytesMut::from(raw);
        assert!(parser.feed(&mut buffer).unwrap());
        parser
    }

    #[test]
    fn continue_only_for_requests_with_body() {
        assert!(expects_continue(&parsed(b"POST / HTTP/1.1\r\nExpect: 100-continue\r\nContent-Length: 3\r\n\r\n")));
        assert!(!expects_continue(&parsed(b"GET / HTTP/1.1\r\nExpect: 100-continue\r\n\r\n")));
        assert!(!expects_continue(&parsed(b"POST / HTTP/1.1\r\nContent-Length: 3\r\n\r\n")));
    }
}
