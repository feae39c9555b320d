//! Decoder implementation for HTTP chunked transfer encoding.
//!
//! This module decodes messages that use chunked transfer encoding as specified in
//! [RFC 9112 Section 7.1](https://www.rfc-editor.org/rfc/rfc9112.html#section-7.1).
//!
//! The decoder is a byte-driven state machine: every byte it looks at is consumed from the
//! source and its effect is kept in the state, so a chunk line split across two reads
//! resumes exactly where it stopped.

use std::task::Poll;

use bytes::Buf;
use tracing::trace;

use crate::protocol::{ParseError, PayloadItem};
use ChunkedState::*;

/// A decoder for handling HTTP chunked transfer encoding.
///
/// The decoder processes incoming bytes according to the chunked format:
/// - Each chunk starts with its size in hexadecimal
/// - Followed by optional extensions and CRLF
/// - Then the chunk data and CRLF
/// - A zero-sized chunk indicates the end of the message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedDecoder {
    state: ChunkedState,
    remaining_size: u64,
}

impl ChunkedDecoder {
    /// Creates a new ChunkedDecoder instance.
    ///
    /// The decoder starts in the Size state, ready to read the size of the first chunk.
    pub fn new() -> Self {
        Self { state: Size, remaining_size: 0 }
    }

    /// Decodes chunked transfer encoded data from the front of `src`.
    ///
    /// # Returns
    /// - `Ok(Some(PayloadItem::Chunk(bytes)))` when chunk data is available
    /// - `Ok(Some(PayloadItem::Eof))` when the final chunk is processed
    /// - `Ok(None)` when more data is needed
    /// - `Err(ParseError)` if the chunked encoding is invalid
    pub fn decode<'b>(&mut self, src: &mut &'b [u8]) -> Result<Option<PayloadItem<&'b [u8]>>, ParseError> {
        loop {
            if self.state == End {
                trace!("finished reading chunked data");
                return Ok(Some(PayloadItem::Eof));
            }

            if src.is_empty() {
                // need more data
                return Ok(None);
            }

            let mut buf = None;

            self.state = match self.state.step(src, &mut self.remaining_size, &mut buf) {
                Poll::Pending => return Ok(None),
                Poll::Ready(Ok(new_state)) => new_state,
                Poll::Ready(Err(e)) => return Err(e),
            };

            if let Some(bytes) = buf {
                trace!(len = bytes.len(), "read chunked bytes");
                return Ok(Some(PayloadItem::Chunk(bytes)));
            }
        }
    }
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkedState {
    /// Read the chunk size in hex
    Size,
    /// Handle whitespace after size
    SizeLws,
    /// Skip chunk extensions
    Extension,
    /// Read LF after chunk size
    SizeLf,
    /// Read chunk data
    Body,
    /// Read CR after chunk data
    BodyCr,
    /// Read LF after chunk data
    BodyLf,
    /// Read optional trailer fields
    Trailer,
    /// Read LF after trailer
    TrailerLf,
    /// Read final CR
    EndCr,
    /// Read final LF
    EndLf,
    /// Final state after reading last chunk
    End,
}

type Step = Poll<Result<ChunkedState, ParseError>>;

macro_rules! try_next_byte {
    ($src:ident) => {{
        if $src.has_remaining() {
            $src.get_u8()
        } else {
            return Poll::Pending;
        }
    }};
}

impl ChunkedState {
    /// Processes the next step in the chunked decoding state machine.
    ///
    /// # Arguments
    /// * `src` - Source bytes containing the chunked data
    /// * `remaining_size` - Tracks remaining bytes in current chunk
    /// * `buf` - Receives decoded chunk data
    fn step<'b>(&self, src: &mut &'b [u8], remaining_size: &mut u64, buf: &mut Option<&'b [u8]>) -> Step {
        match self {
            Size => ChunkedState::read_size(src, remaining_size),
            SizeLws => ChunkedState::read_size_lws(src),
            Extension => ChunkedState::read_extension(src),
            SizeLf => ChunkedState::read_size_lf(src, *remaining_size),
            Body => ChunkedState::read_body(src, remaining_size, buf),
            BodyCr => ChunkedState::read_body_cr(src),
            BodyLf => ChunkedState::read_body_lf(src),
            Trailer => ChunkedState::read_trailer(src),
            TrailerLf => ChunkedState::read_trailer_lf(src),
            EndCr => ChunkedState::read_end_cr(src),
            EndLf => ChunkedState::read_end_lf(src),
            End => Poll::Ready(Ok(End)),
        }
    }

    /// Reads one hex digit of the chunk size.
    ///
    /// - On hex digit: Stay in Size state to read more digits
    /// - On whitespace (tab/space): Transition to SizeLws state
    /// - On semicolon: Transition to Extension state
    /// - On CR: Transition to SizeLf state
    fn read_size(src: &mut &[u8], size_per_chunk: &mut u64) -> Step {
        let digit = match try_next_byte!(src) {
            b @ b'0'..=b'9' => b - b'0',
            b @ b'a'..=b'f' => b + 10 - b'a',
            b @ b'A'..=b'F' => b + 10 - b'A',
            b'\t' | b' ' => return Poll::Ready(Ok(SizeLws)),
            b';' => return Poll::Ready(Ok(Extension)),
            b'\r' => return Poll::Ready(Ok(SizeLf)),
            _ => return Poll::Ready(Err(ParseError::invalid_chunk("invalid chunk size line: Invalid Size"))),
        };

        match size_per_chunk.checked_mul(16).and_then(|size| size.checked_add(u64::from(digit))) {
            Some(size) => {
                *size_per_chunk = size;
                Poll::Ready(Ok(Size))
            }
            None => Poll::Ready(Err(ParseError::invalid_chunk("invalid overflow chunked length"))),
        }
    }

    /// Processes linear whitespace after the chunk size, no more digits can come.
    fn read_size_lws(src: &mut &[u8]) -> Step {
        match try_next_byte!(src) {
            b'\t' | b' ' => Poll::Ready(Ok(SizeLws)),
            b';' => Poll::Ready(Ok(Extension)),
            b'\r' => Poll::Ready(Ok(SizeLf)),
            _ => Poll::Ready(Err(ParseError::invalid_chunk("invalid chunk size linear white space"))),
        }
    }

    /// Skips chunk extensions up to the CR ending the size line.
    ///
    /// Some implementations may not check for the CR, so a plain LF inside an
    /// extension is rejected.
    fn read_extension(src: &mut &[u8]) -> Step {
        match try_next_byte!(src) {
            b'\r' => Poll::Ready(Ok(SizeLf)),
            b'\n' => Poll::Ready(Err(ParseError::invalid_chunk("invalid chunk extension contains newline"))),
            _ => Poll::Ready(Ok(Extension)),
        }
    }

    /// Validates the LF ending the size line, a zero size starts the trailer section.
    fn read_size_lf(src: &mut &[u8], size_per_chunk: u64) -> Step {
        match try_next_byte!(src) {
            b'\n' if size_per_chunk == 0 => Poll::Ready(Ok(EndCr)),
            b'\n' => Poll::Ready(Ok(Body)),
            _ => Poll::Ready(Err(ParseError::invalid_chunk("invalid chunk size LF"))),
        }
    }

    /// Reads up to `size_per_chunk` bytes of chunk data.
    fn read_body<'b>(src: &mut &'b [u8], size_per_chunk: &mut u64, buf: &mut Option<&'b [u8]>) -> Step {
        if src.is_empty() {
            return Poll::Ready(Ok(Body));
        }

        if *size_per_chunk == 0 {
            return Poll::Ready(Ok(BodyCr));
        }

        // cap remaining bytes at the max capacity of usize
        let remaining = usize::try_from(*size_per_chunk).unwrap_or(usize::MAX);
        let read_size = remaining.min(src.len());

        let (chunk, rest) = src.split_at(read_size);
        *src = rest;
        *size_per_chunk -= read_size as u64;
        *buf = Some(chunk);

        if *size_per_chunk > 0 { Poll::Ready(Ok(Body)) } else { Poll::Ready(Ok(BodyCr)) }
    }

    fn read_body_cr(src: &mut &[u8]) -> Step {
        match try_next_byte!(src) {
            b'\r' => Poll::Ready(Ok(BodyLf)),
            _ => Poll::Ready(Err(ParseError::invalid_chunk("invalid chunk body CR"))),
        }
    }

    fn read_body_lf(src: &mut &[u8]) -> Step {
        match try_next_byte!(src) {
            b'\n' => Poll::Ready(Ok(Size)),
            _ => Poll::Ready(Err(ParseError::invalid_chunk("invalid chunk body LF"))),
        }
    }

    /// Trailer fields after the last chunk are read and ignored.
    fn read_trailer(src: &mut &[u8]) -> Step {
        match try_next_byte!(src) {
            b'\r' => Poll::Ready(Ok(TrailerLf)),
            _ => Poll::Ready(Ok(Trailer)),
        }
    }

    fn read_trailer_lf(src: &mut &[u8]) -> Step {
        match try_next_byte!(src) {
            b'\n' => Poll::Ready(Ok(EndCr)),
            _ => Poll::Ready(Err(ParseError::invalid_chunk("invalid trailer end LF"))),
        }
    }

    /// Either the final CRLF or the start of another trailer field.
    fn read_end_cr(src: &mut &[u8]) -> Step {
        match try_next_byte!(src) {
            b'\r' => Poll::Ready(Ok(EndLf)),
            _ => Poll::Ready(Ok(Trailer)),
        }
    }

    fn read_end_lf(src: &mut &[u8]) -> Step {
        match try_next_byte!(src) {
            b'\n' => Poll::Ready(Ok(End)),
            _ => Poll::Ready(Err(ParseError::invalid_chunk("invalid chunk end LF"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk<'b>(decoder: &mut ChunkedDecoder, src: &mut &'b [u8]) -> &'b [u8] {
        match decoder.decode(src).unwrap() {
            Some(PayloadItem::Chunk(bytes)) => bytes,
            other => panic!("expected chunk, got {other:?}"),
        }
    }

    #[test]
    fn test_basic() {
        let mut buffer: &[u8] = b"10\r\n1234567890abcdef\r\n0\r\n\r\n";
        let mut decoder = ChunkedDecoder::new();

        assert_eq!(chunk(&mut decoder, &mut buffer), b"1234567890abcdef");
        assert!(decoder.decode(&mut buffer).unwrap().unwrap().is_eof());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_multiple_chunks() {
        let mut buffer: &[u8] = b"5\r\nhello\r\n7\r\n, world\r\n0\r\n\r\n";
        let mut decoder = ChunkedDecoder::new();

        assert_eq!(chunk(&mut decoder, &mut buffer), b"hello");
        assert_eq!(chunk(&mut decoder, &mut buffer), b", world");
        assert!(decoder.decode(&mut buffer).unwrap().unwrap().is_eof());
    }

    #[test]
    fn test_chunks_with_extensions() {
        let mut buffer: &[u8] = b"5;chunk-ext=value\r\nhello\r\n0\r\n\r\n";
        let mut decoder = ChunkedDecoder::new();

        assert_eq!(chunk(&mut decoder, &mut buffer), b"hello");
        assert!(decoder.decode(&mut buffer).unwrap().unwrap().is_eof());
    }

    #[test]
    fn test_chunks_with_trailers() {
        let mut buffer: &[u8] = b"5\r\nhello\r\n0\r\nTrailer: value\r\n\r\n";
        let mut decoder = ChunkedDecoder::new();

        assert_eq!(chunk(&mut decoder, &mut buffer), b"hello");
        assert!(decoder.decode(&mut buffer).unwrap().unwrap().is_eof());
    }

    #[test]
    fn test_incomplete_chunk() {
        let mut decoder = ChunkedDecoder::new();

        let mut first: &[u8] = b"5\r\nhel";
        assert_eq!(chunk(&mut decoder, &mut first), b"hel");

        let mut rest: &[u8] = b"lo\r\n0\r\n\r\n";
        assert_eq!(chunk(&mut decoder, &mut rest), b"lo");
        assert!(decoder.decode(&mut rest).unwrap().unwrap().is_eof());
    }

    #[test]
    fn size_line_split_across_reads() {
        let mut decoder = ChunkedDecoder::new();

        let mut first: &[u8] = b"1";
        assert_eq!(decoder.decode(&mut first).unwrap(), None);
        assert!(first.is_empty());

        let mut rest: &[u8] = b"0\r\n1234567890abcdef\r\n0\r\n\r\n";
        assert_eq!(chunk(&mut decoder, &mut rest).len(), 16);
    }

    #[test]
    fn test_invalid_chunk_size() {
        let mut buffer: &[u8] = b"xyz\r\n";
        let mut decoder = ChunkedDecoder::new();

        assert!(matches!(decoder.decode(&mut buffer), Err(ParseError::InvalidChunk { .. })));
    }

    #[test]
    fn test_missing_crlf() {
        let mut buffer: &[u8] = b"5\r\nhelloBad";
        let mut decoder = ChunkedDecoder::new();

        assert_eq!(chunk(&mut decoder, &mut buffer), b"hello");
        assert!(decoder.decode(&mut buffer).is_err());
    }

    #[test]
    fn test_overflow_size() {
        let mut buffer: &[u8] = b"fffffffffffffffff\r\n";
        let mut decoder = ChunkedDecoder::new();

        assert!(decoder.decode(&mut buffer).is_err());
    }

    #[test]
    fn test_large_chunk() {
        let size = 1024 * 1024;
        let mut data = Vec::with_capacity(size + 16);
        data.extend(format!("{size:x}\r\n").into_bytes());
        data.extend(vec![b'A'; size]);
        data.extend(b"\r\n0\r\n\r\n");

        let mut buffer: &[u8] = &data;
        let mut decoder = ChunkedDecoder::new();

        let bytes = chunk(&mut decoder, &mut buffer);
        assert_eq!(bytes.len(), size);
        assert!(bytes.iter().all(|&b| b == b'A'));

        assert!(decoder.decode(&mut buffer).unwrap().unwrap().is_eof());
    }

    #[test]
    fn test_zero_size_chunk() {
        let mut buffer: &[u8] = b"0\r\n\r\n";
        let mut decoder = ChunkedDecoder::new();

        assert!(decoder.decode(&mut buffer).unwrap().unwrap().is_eof());
    }
}
