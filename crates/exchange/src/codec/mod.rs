//! HTTP codec module for encoding and decoding HTTP messages
//!
//! # Architecture
//!
//! - Decoding:
//!   - [`RequestHeaderDecoder`] / [`ResponseHeaderDecoder`] parse message heads and find the
//!     payload framing
//!   - [`PayloadDecoder`] pulls the body out of a borrowed byte slice, leaving whatever it did
//!     not consume to the caller
//!
//! - Encoding:
//!   - [`RequestEncoder`] / [`ResponseEncoder`] serialize a head followed by its payload
//!     frames, see [`MessageEncoder`]
//!
//! # Example
//!
//! ```
//! use bytes::{Bytes, BytesMut};
//! use micro_exchange::codec::{PayloadDecoder, ResponseHeaderDecoder};
//! use micro_exchange::protocol::PayloadItem;
//! use tokio_util::codec::Decoder;
//!
//! let mut buffer = BytesMut::from(&b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok"[..]);
//! let (header, payload_size) = ResponseHeaderDecoder::default().decode(&mut buffer).unwrap().unwrap();
//! assert_eq!(header.status(), 200);
//!
//! let mut body: &[u8] = &buffer;
//! let mut decoder = PayloadDecoder::from(payload_size);
//! assert_eq!(decoder.decode(&mut body).unwrap(), Some(PayloadItem::Chunk(&b"ok"[..])));
//! ```

mod body;
mod header;
mod message_encoder;

pub use body::{PayloadDecoder, PayloadEncoder};
pub use header::{HeaderEncoder, HeaderLimits, RequestHeaderDecoder, ResponseHeaderDecoder};
pub use message_encoder::{MessageEncoder, RequestEncoder, ResponseEncoder};
