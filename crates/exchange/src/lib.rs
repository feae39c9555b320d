//! Deadline-aware composed HTTP/1.1 message exchange
//!
//! This crate reads and writes HTTP/1.1 messages over any tokio byte stream as composed
//! operations: one call that performs as many partial reads as the message needs, observes
//! a per-read deadline, and resolves exactly once with either the complete message or a
//! typed error.
//!
//! # Example
//!
//! ```no_run
//! use micro_exchange::parser::StringBody;
//! use micro_exchange::{server, Session};
//! use http::Response;
//! use http_body_util::Full;
//! use bytes::Bytes;
//! use tokio::net::TcpListener;
//! use tracing::{error, info};
//!
//! #[tokio::main]
//! async fn main() {
//!     let listener = TcpListener::bind("127.0.0.1:8080").await.unwrap();
//!     let (stream, _remote_addr) = listener.accept().await.unwrap();
//!     let mut session = Session::new(stream);
//!
//!     loop {
//!         let request = match server::read_request(&mut session, StringBody::new()).await {
//!             Ok(request) => request,
//!             Err(e) => {
//!                 error!(cause = %e, "can't read request, connection shutdown");
//!                 return;
//!             }
//!         };
//!         info!(path = request.uri().path(), body = %request.body(), "receive request");
//!
//!         let response = Response::new(Full::new(Bytes::from_static(b"Hello World!\r\n")));
//!         if let Err(e) = server::write_response(&mut session, response).await {
//!             error!(cause = %e, "can't send response");
//!             return;
//!         }
//!     }
//! }
//! ```
//!
//! # Architecture
//!
//! - [`protocol`]: message heads, payload framing and error types
//! - [`codec`]: header and payload decoders and encoders
//! - [`parser`]: the header parse state, the body parser and body materialization policies
//! - [`deadline`]: the deadline shared with the transport, and the transport enforcing it
//! - [`exec`]: executors, [`Strand`](exec::Strand) and completion handlers
//! - [`op`]: the composed [`ReadHeader`](op::ReadHeader) and [`ReadBody`](op::ReadBody) operations
//! - [`client`] and [`server`]: request/response exchanges built on the operations
//!
//! # Operations
//!
//! Every read operation follows the same steps:
//!
//! 1. The first poll only yields, so completion never happens inside the starting call.
//! 2. The [`Deadline`](deadline::Deadline) is armed for [`ExchangeConfig::read_timeout`]
//!    before each read, bounding every single read rather than the whole message.
//! 3. The bytes read are fed to the parser and the consumed ones dropped from the session
//!    buffer, whether the step failed or not.
//! 4. The operation resolves once the parser is complete. A peer closing the stream ends a
//!    body successfully, any other failure resolves to an [`ExchangeError`].
//!
//! Operations come in two forms: futures borrowing a [`Session`], and continuation-passing
//! functions (`async_*`) that take the session by value and hand it back to a
//! [`Completion`](exec::Completion). A completion may carry an executor it has to run on
//! and an [`Allocator`] the body is stored with.
//!
//! ## Error Handling
//!
//! - [`protocol::ExchangeError`]: Top-level error type
//! - [`protocol::ParseError`]: Message parsing errors
//! - [`protocol::SendError`]: Message sending errors
//!
//! # Limitations
//!
//! - HTTP/1.1 and HTTP/1.0 only
//! - No TLS support, wrap the stream before creating the session
//! - Default maximum header size: 8KB
//! - Default maximum number of headers: 64

pub mod client;
pub mod codec;
pub mod config;
pub mod deadline;
pub mod exec;
pub mod op;
pub mod parser;
pub mod protocol;
pub mod server;

mod allocator;
mod session;
mod utils;
mod writer;

pub use allocator::{Allocator, Global};
pub use config::ExchangeConfig;
pub use protocol::{ExchangeError, ErrorKind};
pub use session::Session;
pub use writer::MessageWriter;

pub(crate) use utils::ensure;
