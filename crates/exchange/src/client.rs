//! The client side of an exchange: write a request, read its response.

use std::fmt::Display;

use http::{Request, Response, StatusCode};
use http_body::Body;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use crate::allocator::{Allocator, Global};
use crate::exec::Completion;
use crate::op::launch;
use crate::parser::BodyPolicy;
use crate::protocol::{ExchangeError, RequestHead, ResponseHeader};
use crate::session::Session;
use crate::writer::MessageWriter;

/// What [`async_send_request`] delivers.
pub type SendRequestOutcome<S, B> = (Result<Response<<B as BodyPolicy>::Value>, ExchangeError>, Session<S>);

/// Sends `request` and reads the response, materializing its body with `body`.
///
/// The request is written in full first. A failed write ends the exchange right there: no
/// response is read and no read deadline is armed. The response is then read the way
/// [`Session::read_header`] and [`Session::read_body`] do, with a deadline armed before
/// every read. Interim `1xx` responses other than `101 Switching Protocols` are skipped.
///
/// ```no_run
/// use http::Request;
/// use http_body_util::Empty;
/// use bytes::Bytes;
/// use micro_exchange::{client, parser::StringBody, Session};
/// use tokio::net::TcpStream;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let mut session = Session::new(TcpStream::connect("127.0.0.1:8080").await?);
/// let request = Request::get("http://127.0.0.1:8080/").body(Empty::<Bytes>::new())?;
/// let response = client::send_request(&mut session, request, StringBody::new()).await?;
/// println!("{}", response.body());
/// # Ok(())
/// # }
/// ```
pub async fn send_request<S, T, B>(
    session: &mut Session<S>,
    request: Request<T>,
    body: B,
) -> Result<Response<B::Value>, ExchangeError>
where
    S: AsyncRead + AsyncWrite + Unpin,
    T: Body + Unpin,
    T::Error: Display,
    B: BodyPolicy,
{
    send_request_in(session, request, body, &Global).await
}

/// Like [`send_request`], storing the response body with `allocator`.
pub async fn send_request_in<S, T, B, A>(
    session: &mut Session<S>,
    request: Request<T>,
    body: B,
    allocator: &A,
) -> Result<Response<B::Value>, ExchangeError>
where
    S: AsyncRead + AsyncWrite + Unpin,
    T: Body + Unpin,
    T::Error: Display,
    B: BodyPolicy,
    A: Allocator,
{
    let (parts, request_body) = request.into_parts();
    let method = parts.method.clone();
    debug!(%method, uri = %parts.uri, "send request");

    MessageWriter::new(session.stream_mut()).send(RequestHead::from_parts(parts, ()), request_body).await?;

    let parser = session.response_parser(&method);
    let mut header = session.read_header(parser).await?;
    while header.header().is_some_and(is_interim) {
        debug!(status = ?header.header().map(ResponseHeader::status), "skip interim response");
        let parser = session.response_parser(&method);
        header = session.read_header(parser).await?;
    }

    session.read_body_in(header, body, allocator).await
}

fn is_interim(header: &ResponseHeader) -> bool {
    header.status().is_informational() && header.status() != StatusCode::SWITCHING_PROTOCOLS
}

/// Starts [`send_request`] on the session's executor, delivering `(result, session)` to
/// `completion` on its executor, or the session's when the completion has none.
///
/// The response body is stored with the allocator of `completion`.
pub fn async_send_request<S, T, B, C>(mut session: Session<S>, request: Request<T>, body: B, completion: C)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    T: Body + Unpin + Send + 'static,
    T::Data: Send,
    T::Error: Display + Send,
    B: BodyPolicy,
    C: Completion<SendRequestOutcome<S, B>>,
{
    let allocator = completion.allocator();

    launch(session.executor(), completion, async move {
        let result = send_request_in(&mut session, request, body, &allocator).await;
        (result, session)
    });
}
