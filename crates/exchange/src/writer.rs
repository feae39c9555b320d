//! Serialization of outgoing messages onto a stream.

use std::fmt::Display;

use bytes::{Buf, BytesMut};
use http_body::Body;
use http_body_util::BodyExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::codec::Encoder;
use tracing::{debug, trace};

use crate::codec::{HeaderEncoder, MessageEncoder};
use crate::protocol::{Message, PayloadItem, PayloadSize, SendError};

const WRITE_BUFFER_SIZE: usize = 8 * 1024;

/// Encodes messages into an internal buffer and writes it out on [`flush`](Self::flush).
#[derive(Debug)]
pub struct MessageWriter<W, H> {
    writer: W,
    buffer: BytesMut,
    encoder: MessageEncoder<H>,
}

impl<W, H> MessageWriter<W, H>
where
    W: AsyncWrite + Unpin,
    HeaderEncoder: Encoder<(H, PayloadSize), Error = SendError>,
{
    pub fn new(writer: W) -> Self {
        Self::with_capacity(writer, WRITE_BUFFER_SIZE)
    }

    pub fn with_capacity(writer: W, buffer_size: usize) -> Self {
        Self { writer, buffer: BytesMut::with_capacity(buffer_size), encoder: MessageEncoder::new() }
    }

    #[inline]
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    #[inline]
    pub fn write<D>(&mut self, item: Message<(H, PayloadSize), D>) -> Result<(), SendError>
    where
        D: Buf,
    {
        self.encoder.encode(item, &mut self.buffer)
    }

    pub async fn flush(&mut self) -> Result<(), SendError> {
        if !self.buffer.is_empty() {
            trace!(len = self.buffer.len(), "write buffered message bytes");
            self.writer.write_all(&self.buffer).await?;
            self.buffer.clear();
        }

        Ok(self.writer.flush().await?)
    }

    /// Writes a whole message, head and body, and flushes it.
    ///
    /// The framing follows the body's size hint: an exact size of zero sends no body, any
    /// other exact size is sent with `Content-Length`, everything else is chunked.
    pub async fn send<T>(&mut self, head: H, mut body: T) -> Result<(), SendError>
    where
        T: Body + Unpin,
        T::Error: Display,
    {
        let payload_size = payload_size(&body);
        debug!(?payload_size, "send message");

        self.write(Message::<_, T::Data>::Header((head, payload_size)))?;

        loop {
            let Some(frame) = body.frame().await else {
                break;
            };
            let frame = frame.map_err(|e| SendError::invalid_body(format!("resolve body error: {e}")))?;
            // trailers are not sent
            let Ok(data) = frame.into_data() else {
                continue;
            };

            self.write(Message::<(H, PayloadSize), _>::Payload(PayloadItem::Chunk(data)))?;
            if self.buffer.len() >= WRITE_BUFFER_SIZE {
                self.flush().await?;
            }
        }

        self.write(Message::<(H, PayloadSize), T::Data>::Payload(PayloadItem::Eof))?;
        self.flush().await
    }
}

fn payload_size<T: Body>(body: &T) -> PayloadSize {
    match body.size_hint().exact() {
        Some(0) => PayloadSize::Empty,
        Some(length) => PayloadSize::Length(length),
        None => PayloadSize::Chunked,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{RequestHead, ResponseHead};
    use bytes::Bytes;
    use futures::stream;
    use http::{Request, Response};
    use http_body::Frame;
    use http_body_util::{Empty, Full, StreamBody};
    use std::convert::Infallible;

    #[tokio::test]
    async fn full_body_uses_content_length() {
        let mut writer = MessageWriter::<_, ResponseHead>::new(Vec::new());
        let head = Response::builder().status(200).body(()).unwrap();

        writer.send(head, Full::new(Bytes::from_static(b"hello"))).await.unwrap();

        assert_eq!(&writer.get_mut()[..], b"HTTP/1.1 200 OK\r\ncontent-length: 5\r\n\r\nhello");
    }

    #[tokio::test]
    async fn empty_request_body() {
        let mut writer = MessageWriter::<_, RequestHead>::new(Vec::new());
        let head = Request::get("/index.html").header("host", "localhost").body(()).unwrap();

        writer.send(head, Empty::<Bytes>::new()).await.unwrap();

        assert_eq!(&writer.get_mut()[..], b"GET /index.html HTTP/1.1\r\nhost: localhost\r\n\r\n");
    }

    #[tokio::test]
    async fn streamed_body_is_chunked() {
        let mut writer = MessageWriter::<_, RequestHead>::new(Vec::new());
        let head = Request::post("/").header("host", "localhost").body(()).unwrap();
        let chunks = stream::iter(vec![
            Ok::<_, Infallible>(Frame::data(Bytes::from_static(b"hello "))),
            Ok(Frame::data(Bytes::from_static(b"world"))),
        ]);

        writer.send(head, StreamBody::new(chunks)).await.unwrap();

        assert_eq!(
            &writer.get_mut()[..],
            &b"POST / HTTP/1.1\r\nhost: localhost\r\ntransfer-encoding: chunked\r\n\r\n6\r\nhello \r\n5\r\nworld\r\n0\r\n\r\n"[..]
        );
    }
}
