//! Decoder for payloads delimited by the peer closing the connection.
//!
//! Such a payload never ends on its own: every available byte belongs to the body, and only
//! the end-of-stream observed by the reader terminates it.

use crate::protocol::{ParseError, PayloadItem};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloseDecoder;

impl CloseDecoder {
    pub fn decode<'b>(&mut self, src: &mut &'b [u8]) -> Result<Option<PayloadItem<&'b [u8]>>, ParseError> {
        if src.is_empty() {
            return Ok(None);
        }

        Ok(Some(PayloadItem::Chunk(std::mem::take(src))))
    }
}
