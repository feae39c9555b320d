//! Decoder implementation for HTTP message payloads.
//!
//! This module provides a unified decoder for handling different types of HTTP message bodies:
//! - Content-Length based payloads
//! - Chunked transfer encoding
//! - Payloads delimited by connection close
//! - Messages with no body
//!
//! The strategy is picked from the [`PayloadSize`] determined while parsing the head.

use crate::codec::body::chunked_decoder::ChunkedDecoder;
use crate::codec::body::close_decoder::CloseDecoder;
use crate::codec::body::length_decoder::LengthDecoder;
use crate::protocol::{ParseError, PayloadItem, PayloadSize};

/// A unified decoder for handling HTTP message payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadDecoder {
    /// The specific decoding strategy to use
    kind: Kind,
}

/// Enum representing different payload decoding strategies.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    /// Decode payload with a fixed content length
    Length(LengthDecoder),

    /// Decode payload using chunked transfer encoding
    Chunked(ChunkedDecoder),

    /// Every byte belongs to the payload until the peer closes
    UntilClose(CloseDecoder),

    /// Handle messages with no body
    NoBody,
}

impl PayloadDecoder {
    /// Creates a PayloadDecoder for messages with no body.
    pub fn empty() -> Self {
        Self { kind: Kind::NoBody }
    }

    /// Creates a PayloadDecoder for chunked transfer encoding.
    pub fn chunked() -> Self {
        Self { kind: Kind::Chunked(ChunkedDecoder::new()) }
    }

    /// Creates a PayloadDecoder for a fixed-length payload.
    pub fn fix_length(size: u64) -> Self {
        Self { kind: Kind::Length(LengthDecoder::new(size)) }
    }

    /// Creates a PayloadDecoder for a payload running until end-of-stream.
    pub fn until_close() -> Self {
        Self { kind: Kind::UntilClose(CloseDecoder) }
    }

    /// Returns whether only a connection close can end this payload.
    pub fn is_close_delimited(&self) -> bool {
        matches!(self.kind, Kind::UntilClose(_))
    }

    /// Decodes bytes from the front of `src` using the appropriate strategy.
    ///
    /// Decoded chunks borrow from `src`, and `src` is advanced past every byte the
    /// decoder looked at.
    pub fn decode<'b>(&mut self, src: &mut &'b [u8]) -> Result<Option<PayloadItem<&'b [u8]>>, ParseError> {
        match &mut self.kind {
            Kind::Length(length_decoder) => length_decoder.decode(src),
            Kind::Chunked(chunked_decoder) => chunked_decoder.decode(src),
            Kind::UntilClose(close_decoder) => close_decoder.decode(src),
            Kind::NoBody => Ok(Some(PayloadItem::Eof)),
        }
    }
}

impl From<PayloadSize> for PayloadDecoder {
    fn from(payload_size: PayloadSize) -> Self {
        match payload_size {
            PayloadSize::Length(size) => PayloadDecoder::fix_length(size),
            PayloadSize::Chunked => PayloadDecoder::chunked(),
            PayloadSize::Empty => PayloadDecoder::empty(),
            PayloadSize::UntilClose => PayloadDecoder::until_close(),
        }
    }
}
