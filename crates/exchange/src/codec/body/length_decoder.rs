//! Decoder implementation for HTTP messages with Content-Length header.
//!
//! This module decodes payloads whose size is specified by the Content-Length header, as defined in
//! [RFC 9112 Section 6.2](https://www.rfc-editor.org/rfc/rfc9112.html#section-6.2).

use crate::protocol::{ParseError, PayloadItem};

/// A decoder for handling HTTP messages with a known content length.
///
/// The decoder tracks the remaining bytes to be read and never reads past the
/// announced length, whatever follows stays in the source for the next message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthDecoder {
    /// The number of bytes remaining to be read from the payload
    length: u64,
}

impl LengthDecoder {
    /// Creates a new LengthDecoder instance.
    ///
    /// # Arguments
    /// * `length` - The total content length to decode, specified by Content-Length header
    pub fn new(length: u64) -> Self {
        Self { length }
    }

    /// Takes payload bytes from the front of `src` according to the content length.
    ///
    /// # Returns
    /// * `Ok(Some(PayloadItem::Eof))` when all bytes have been read
    /// * `Ok(Some(PayloadItem::Chunk(bytes)))` when a chunk is available
    /// * `Ok(None)` when more data is needed
    pub fn decode<'b>(&mut self, src: &mut &'b [u8]) -> Result<Option<PayloadItem<&'b [u8]>>, ParseError> {
        if self.length == 0 {
            return Ok(Some(PayloadItem::Eof));
        }

        if src.is_empty() {
            return Ok(None);
        }

        // Read the minimum of remaining length and available bytes
        let len = usize::try_from(self.length).map_or(src.len(), |length| length.min(src.len()));
        let (chunk, rest) = src.split_at(len);
        *src = rest;

        self.length -= len as u64;
        Ok(Some(PayloadItem::Chunk(chunk)))
    }
}
