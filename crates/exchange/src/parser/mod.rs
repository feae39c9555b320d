//! Message parsing on top of the codecs.
//!
//! Parsing happens in two steps. A [`HeaderParser`] is fed until the head is complete,
//! then it is consumed by a [`BodyParser`] which reads the body according to the framing
//! and hands the bytes to a [`BodyPolicy`].

mod body;
mod body_parser;
mod header_parser;

pub use body::{BodyPolicy, BytesBody, DiscardBody, FixedBody, SinkBody, StringBody};
pub use body_parser::BodyParser;
pub use header_parser::HeaderParser;
