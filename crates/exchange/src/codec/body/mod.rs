//! HTTP message body handling module
//!
//! Decoders borrow from the read buffer and report exactly how far they got, so the
//! caller decides what to drain. Encoders write into an output [`bytes::BytesMut`].
//!
//! - Content-Length: [`length_decoder`] / [`length_encoder`]
//! - Chunked: [`chunked_decoder`] / [`chunked_encoder`]
//! - Connection close: [`close_decoder`], raw pass-through on the encoding side
//! - [`PayloadDecoder`] and [`PayloadEncoder`] pick the strategy from a [`crate::protocol::PayloadSize`]

mod chunked_decoder;
mod chunked_encoder;
mod close_decoder;
mod length_decoder;
mod length_encoder;
mod payload_decoder;
mod payload_encoder;

pub use payload_decoder::PayloadDecoder;
pub use payload_encoder::PayloadEncoder;
