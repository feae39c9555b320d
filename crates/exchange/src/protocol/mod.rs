//! Core HTTP protocol abstractions.
//!
//! - **Message Handling** ([`message`]): frames handed to the encoders
//!   - [`Message`]: Represents either a head or a payload chunk
//!   - [`PayloadItem`]: Handles individual payload chunks and EOF
//!   - [`PayloadSize`]: How a payload is delimited on the wire
//!
//! - **Heads** ([`request`], [`response`]): parsed and outgoing message heads
//!   - [`RequestHeader`] / [`ResponseHeader`]: produced by the header decoders
//!   - [`RequestHead`] / [`ResponseHead`]: handed to the encoders
//!   - [`MessageHead`]: what both parsed heads have in common
//!
//! - **Error Handling** ([`error`]):
//!   - [`ExchangeError`]: Top-level error type delivered by every operation
//!   - [`ParseError`]: Message parsing errors
//!   - [`SendError`]: Message sending errors

mod message;
pub use message::Message;
pub use message::PayloadItem;
pub use message::PayloadSize;

mod head;
pub use head::MessageHead;

mod request;
pub use request::RequestHead;
pub use request::RequestHeader;

mod response;
pub use response::ResponseHead;
pub use response::ResponseHeader;

mod error;
pub use error::ErrorKind;
pub use error::ExchangeError;
pub use error::ParseError;
pub use error::SendError;
