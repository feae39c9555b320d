//! HTTP header processing module for encoding and decoding message heads
//!
//! - [`RequestHeaderDecoder`] / [`ResponseHeaderDecoder`]: decode heads from raw bytes
//!   - Supports standard HTTP/1.1 header format
//!   - Enforces the configured [`HeaderLimits`]
//!   - Determines the payload framing of the message
//!
//! - [`HeaderEncoder`]: encodes request and response heads to bytes
//!   - Writes the request line or status line
//!   - Manages content-length and transfer-encoding headers

mod header_decoder;
mod header_encoder;

pub use header_decoder::HeaderLimits;
pub use header_decoder::RequestHeaderDecoder;
pub use header_decoder::ResponseHeaderDecoder;
pub use header_encoder::HeaderEncoder;
