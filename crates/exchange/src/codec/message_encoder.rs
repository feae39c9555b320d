//! Encoder for whole outgoing messages, head first and then the payload frames.

use std::io;
use std::io::ErrorKind;
use std::marker::PhantomData;

use bytes::{Buf, BytesMut};
use tokio_util::codec::Encoder;
use tracing::error;

use crate::codec::body::PayloadEncoder;
use crate::codec::header::HeaderEncoder;
use crate::protocol::{Message, PayloadSize, RequestHead, ResponseHead, SendError};

/// Encodes a [`Message`] stream for the head type `H`.
///
/// A head must come first and selects the payload framing. Payload items are then
/// accepted up to and including [`PayloadItem::Eof`](crate::protocol::PayloadItem::Eof), after which the next head may follow.
#[derive(Debug)]
pub struct MessageEncoder<H> {
    header_encoder: HeaderEncoder,
    payload_encoder: Option<PayloadEncoder>,
    _head: PhantomData<fn(H)>,
}

/// Encoder for outgoing requests.
pub type RequestEncoder = MessageEncoder<RequestHead>;

/// Encoder for outgoing responses.
pub type ResponseEncoder = MessageEncoder<ResponseHead>;

impl<H> MessageEncoder<H> {
    pub fn new() -> Self {
        Self { header_encoder: HeaderEncoder, payload_encoder: None, _head: PhantomData }
    }

    /// Whether the previous message was completely encoded.
    pub fn is_idle(&self) -> bool {
        self.payload_encoder.is_none()
    }
}

impl<H> Default for MessageEncoder<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H, D> Encoder<Message<(H, PayloadSize), D>> for MessageEncoder<H>
where
    D: Buf,
    HeaderEncoder: Encoder<(H, PayloadSize), Error = SendError>,
{
    type Error = SendError;

    fn encode(&mut self, item: Message<(H, PayloadSize), D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            Message::Header((head, payload_size)) => {
                if self.payload_encoder.is_some() {
                    error!("expect payload item but receive message head");
                    return Err(io::Error::from(ErrorKind::InvalidInput).into());
                }

                self.header_encoder.encode((head, payload_size), dst)?;
                self.payload_encoder = Some(PayloadEncoder::from(payload_size));
                Ok(())
            }

            Message::Payload(payload_item) => {
                let Some(payload_encoder) = &mut self.payload_encoder else {
                    error!("expect message head but receive payload item");
                    return Err(io::Error::from(ErrorKind::InvalidInput).into());
                };

                let is_eof = payload_item.is_eof();
                let result = payload_encoder.encode(payload_item, dst);

                if is_eof || result.is_err() {
                    self.payload_encoder.take();
                }

                result
            }
        }
    }
}
