//! Composed read operations.
//!
//! [`ReadHeader`] and [`ReadBody`] are futures borrowing a [`Session`]. The
//! continuation-passing forms [`async_read_header`] and [`async_read_body`] take the
//! session by value and run the operation on the session's executor. Only the final
//! `(result, session)` delivery is submitted to the completion's executor (or the
//! session's when the completion has none), exactly once and never before the starting
//! call has returned. A serialized executor such as [`Strand`](crate::exec::Strand) is
//! therefore held for the completion call alone, not across the reads.

mod read_body;
mod read_header;

pub use read_body::ReadBody;
pub use read_header::ReadHeader;

use std::sync::Arc;

use tokio::io::AsyncRead;
use tracing::{debug, trace};

use crate::exec::{Completion, Executor};
use crate::parser::{BodyPolicy, HeaderParser};
use crate::protocol::{ExchangeError, MessageHead};
use crate::session::Session;

/// Why the read loop stopped before the parser finished.
#[derive(Debug)]
pub(crate) enum Halt {
    Eof,
    Failed(ExchangeError),
}

/// What [`async_read_header`] delivers.
pub type ReadHeaderOutcome<S, H> = (Result<HeaderParser<H>, ExchangeError>, Session<S>);

/// What [`async_read_body`] delivers.
pub type ReadBodyOutcome<S, H, B> =
    (Result<<H as MessageHead>::Message<<B as BodyPolicy>::Value>, ExchangeError>, Session<S>);

/// Runs `operation` on `native` and submits the delivery of its outcome to the executor of
/// `completion`, falling back to `native`.
pub(crate) fn launch<T, C, F>(native: Arc<dyn Executor>, completion: C, operation: F)
where
    T: Send + 'static,
    C: Completion<T>,
    F: Future<Output = T> + Send + 'static,
{
    let target = completion.executor().unwrap_or_else(|| Arc::clone(&native));

    native.execute(Box::pin(async move {
        let outcome = operation.await;
        trace!("operation finished, dispatch completion");
        target.execute(Box::pin(async move { completion.complete(outcome) }));
    }));
}

/// Starts reading a message head, reporting to `completion`.
pub fn async_read_header<S, H, C>(mut session: Session<S>, parser: HeaderParser<H>, completion: C)
where
    S: AsyncRead + Unpin + Send + 'static,
    H: MessageHead,
    C: Completion<ReadHeaderOutcome<S, H>>,
{
    launch(session.executor(), completion, async move {
        let result = session.read_header(parser).await;
        (result, session)
    });
}

/// Starts reading the body following the head parsed by `header`, reporting to `completion`.
///
/// The body is stored with the allocator of `completion`.
pub fn async_read_body<S, H, B, C>(mut session: Session<S>, header: HeaderParser<H>, body: B, completion: C)
where
    S: AsyncRead + Unpin + Send + 'static,
    H: MessageHead,
    B: BodyPolicy,
    C: Completion<ReadBodyOutcome<S, H, B>>,
    H::Message<B::Value>: Send,
{
    let allocator = completion.allocator();
    debug!(payload_size = ?header.payload_size(), "start body read");

    launch(session.executor(), completion, async move {
        let result = session.read_body_in(header, body, &allocator).await;
        (result, session)
    });
}
