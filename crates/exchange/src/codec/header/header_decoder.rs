//! HTTP header decoders for parsing request and response heads
//!
//! This module decodes the start line and header fields of a message from raw bytes into
//! structured header representations, and determines how the payload that follows is framed.
//!
//! # Features
//!
//! - Header parsing using `httparse`, header values shared with the source buffer
//! - Support for HTTP/1.0 and HTTP/1.1
//! - Built-in protection against oversized headers
//! - Payload framing selection based on headers
//!
//! # Implementation Details
//!
//! The decoders work in multiple stages:
//!
//! 1. Parse raw bytes using `httparse`
//! 2. Record header name/value byte ranges
//! 3. Split the head off the source buffer and build the typed `http` structure
//! 4. Determine payload framing based on headers
//!
//! The header bytes are consumed from the source buffer only once the head is complete,
//! anything after the blank line stays in the buffer for the body parser.

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, HeaderName, HeaderValue, Request, Response, StatusCode, Version};
use httparse::Status;
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::config::ExchangeConfig;
use crate::ensure;
use crate::protocol::{ParseError, PayloadSize, RequestHeader, ResponseHeader};

/// Size and count limits applied while decoding a head.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct HeaderLimits {
    pub max_header_bytes: usize,
    pub max_headers: usize,
}

impl From<&ExchangeConfig> for HeaderLimits {
    fn from(config: &ExchangeConfig) -> Self {
        Self { max_header_bytes: config.max_header_bytes, max_headers: config.max_headers }
    }
}

impl Default for HeaderLimits {
    fn default() -> Self {
        (&ExchangeConfig::default()).into()
    }
}

/// Decoder for HTTP request heads implementing the [`Decoder`] trait.
#[derive(Debug, Clone, Default)]
pub struct RequestHeaderDecoder {
    limits: HeaderLimits,
}

impl RequestHeaderDecoder {
    pub fn new(limits: HeaderLimits) -> Self {
        Self { limits }
    }
}

impl Decoder for RequestHeaderDecoder {
    type Item = (RequestHeader, PayloadSize);
    type Error = ParseError;

    /// Attempts to decode a request head from the provided bytes buffer.
    ///
    /// # Returns
    ///
    /// - `Ok(Some((header, payload_size)))` if a complete head was parsed
    /// - `Ok(None)` if more data is needed
    /// - `Err(ParseError)` if parsing failed
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Minimum valid HTTP request needs at least "GET / HTTP/1.1\r\n\r\n"
        if src.len() < 14 {
            return Ok(None);
        }

        let mut headers = vec![httparse::EMPTY_HEADER; self.limits.max_headers];
        let mut req = httparse::Request::new(&mut headers);

        let status = req.parse(src).map_err(|e| map_httparse_error(e, self.limits.max_headers))?;
        let body_offset = match status {
            Status::Complete(body_offset) => body_offset,
            Status::Partial => return partial(src, self.limits),
        };

        trace!(header_size = body_offset, "parsed request header size");
        ensure!(body_offset <= self.limits.max_header_bytes, ParseError::too_large_header(body_offset, self.limits.max_header_bytes));

        let index = HeaderIndex::record(src, req.headers);
        let version = parse_version(req.version)?;

        let mut builder = Request::builder()
            .method(req.method.ok_or(ParseError::InvalidMethod)?)
            .uri(req.path.ok_or(ParseError::InvalidUri)?)
            .version(version);

        let header_bytes = src.split_to(body_offset).freeze();
        if let Some(header_map) = builder.headers_mut() {
            fill_header_map(header_map, &header_bytes, &index)?;
        }

        let header = RequestHeader::from(builder.body(()).map_err(|e| ParseError::invalid_header(e.to_string()))?);
        let payload_size = header.payload_size()?;

        Ok(Some((header, payload_size)))
    }
}

/// Decoder for HTTP response heads implementing the [`Decoder`] trait.
///
/// The payload framing of a response depends on the request it answers, so the decoder
/// is told whether that request was a `HEAD`.
#[derive(Debug, Clone, Default)]
pub struct ResponseHeaderDecoder {
    limits: HeaderLimits,
    head_request: bool,
}

impl ResponseHeaderDecoder {
    pub fn new(limits: HeaderLimits, head_request: bool) -> Self {
        Self { limits, head_request }
    }
}

impl Decoder for ResponseHeaderDecoder {
    type Item = (ResponseHeader, PayloadSize);
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let mut headers = vec![httparse::EMPTY_HEADER; self.limits.max_headers];
        let mut res = httparse::Response::new(&mut headers);

        let status = res.parse(src).map_err(|e| map_httparse_error(e, self.limits.max_headers))?;
        let body_offset = match status {
            Status::Complete(body_offset) => body_offset,
            Status::Partial => return partial(src, self.limits),
        };

        trace!(header_size = body_offset, "parsed response header size");
        ensure!(body_offset <= self.limits.max_header_bytes, ParseError::too_large_header(body_offset, self.limits.max_header_bytes));

        let index = HeaderIndex::record(src, res.headers);
        let version = parse_version(res.version)?;
        let status = res
            .code
            .and_then(|code| StatusCode::from_u16(code).ok())
            .ok_or(ParseError::InvalidStatus(res.code))?;

        let mut builder = Response::builder().status(status).version(version);

        let header_bytes = src.split_to(body_offset).freeze();
        if let Some(header_map) = builder.headers_mut() {
            fill_header_map(header_map, &header_bytes, &index)?;
        }

        let header = ResponseHeader::from(builder.body(()).map_err(|e| ParseError::invalid_header(e.to_string()))?);
        let payload_size = header.payload_size(self.head_request)?;

        Ok(Some((header, payload_size)))
    }
}

fn map_httparse_error(e: httparse::Error, max_headers: usize) -> ParseError {
    match e {
        httparse::Error::TooManyHeaders => ParseError::too_many_headers(max_headers),
        httparse::Error::Version => ParseError::InvalidVersion(None),
        httparse::Error::Status => ParseError::InvalidStatus(None),
        e => ParseError::invalid_header(e.to_string()),
    }
}

/// If parsing is incomplete, ensure the buffered head does not already exceed the limit.
fn partial<T>(src: &BytesMut, limits: HeaderLimits) -> Result<Option<T>, ParseError> {
    ensure!(src.len() <= limits.max_header_bytes, ParseError::too_large_header(src.len(), limits.max_header_bytes));
    Ok(None)
}

fn parse_version(version: Option<u8>) -> Result<Version, ParseError> {
    match version {
        Some(0) => Ok(Version::HTTP_10),
        Some(1) => Ok(Version::HTTP_11),
        // Currently HTTP/2 and HTTP/3 not supported
        _ => Err(ParseError::InvalidVersion(version)),
    }
}

fn fill_header_map(header_map: &mut HeaderMap, header_bytes: &Bytes, index: &[HeaderIndex]) -> Result<(), ParseError> {
    header_map.reserve(index.len());
    for index in index {
        let name = HeaderName::from_bytes(&header_bytes[index.name.0..index.name.1])
            .map_err(|e| ParseError::invalid_header(e.to_string()))?;

        // the value shares the frozen header bytes instead of copying them
        let value = HeaderValue::from_maybe_shared(header_bytes.slice(index.value.0..index.value.1))
            .map_err(|e| ParseError::invalid_header(e.to_string()))?;

        header_map.append(name, value);
    }
    Ok(())
}

/// Stores the byte range positions of a header's name and value within the original buffer.
#[derive(Clone, Copy)]
struct HeaderIndex {
    /// Start and end byte positions of the header name
    name: (usize, usize),
    /// Start and end byte positions of the header value
    value: (usize, usize),
}

impl HeaderIndex {
    /// Records the byte positions of header names and values from the parsed headers.
    fn record(bytes: &[u8], headers: &[httparse::Header<'_>]) -> Vec<HeaderIndex> {
        let bytes_ptr = bytes.as_ptr() as usize;
        headers
            .iter()
            .map(|header| {
                let name_start = header.name.as_ptr() as usize - bytes_ptr;
                let value_start = header.value.as_ptr() as usize - bytes_ptr;
                HeaderIndex {
                    name: (name_start, name_start + header.name.len()),
                    value: (value_start, value_start + header.value.len()),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use indoc::indoc;

    #[test]
    fn test_bytes_mut_lens() {
        let str = indoc! {r##"
        GET /index.html HTTP/1.1
        Host: 127.0.0.1:8080
        User-Agent: curl/7.79.1
        Accept: */*

        123"##};

        let mut bytes = BytesMut::from(str);

        let result = RequestHeaderDecoder::default().decode(&mut bytes).unwrap();

        assert!(result.is_some());

        assert_eq!(bytes.len(), 3);
        assert_eq!(&bytes[..], &b"123"[..]);
    }

    #[test]
    fn from_curl() {
        let str = indoc! {r##"
        GET /index.html HTTP/1.1
        Host: 127.0.0.1:8080
        User-Agent: curl/7.79.1
        Accept: */*

        "##};

        let mut buf = BytesMut::from(str);

        let (header, payload_size) = RequestHeaderDecoder::default().decode(&mut buf).unwrap().unwrap();

        assert!(payload_size.is_empty());

        assert_eq!(header.method(), &Method::GET);
        assert_eq!(header.version(), Version::HTTP_11);
        assert_eq!(header.uri().host(), None);
        assert_eq!(header.uri().path(), "/index.html");
        assert_eq!(header.uri().query(), None);

        assert_eq!(header.headers().len(), 3);

        assert_eq!(header.headers().get(http::header::ACCEPT), Some(&HeaderValue::from_str("*/*").unwrap()));
        assert_eq!(header.headers().get(http::header::HOST), Some(&HeaderValue::from_str("127.0.0.1:8080").unwrap()));
        assert_eq!(header.headers().get(http::header::USER_AGENT), Some(&HeaderValue::from_str("curl/7.79.1").unwrap()));
    }

    #[test]
    fn from_edge() {
        let str = indoc! {r##"
        GET /index/?a=1&b=2&a=3 HTTP/1.1
        Host: 127.0.0.1:8080
        Connection: keep-alive
        Cache-Control: max-age=0
        sec-ch-ua: "#Not_A Brand";v="99", "Microsoft Edge";v="109", "Chromium";v="109"
        sec-ch-ua-mobile: ?0
        sec-ch-ua-platform: "macOS"
        Upgrade-Insecure-Requests: 1
        User-Agent: Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/109.0.0.0 Safari/537.36 Edg/109.0.1518.52
        Accept: text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.9
        Sec-Fetch-Site: none
        Sec-Fetch-Mode: navigate
        Sec-Fetch-User: ?1
        Sec-Fetch-Dest: document
        Accept-Encoding: gzip, deflate, br
        Accept-Language: zh-CN,zh;q=0.9,en-US;q=0.8,en;q=0.7

        "##};

        let mut buf = BytesMut::from(str);

        let (header, payload_size) = RequestHeaderDecoder::default().decode(&mut buf).unwrap().unwrap();

        assert!(payload_size.is_empty());
        assert!(buf.is_empty());

        assert_eq!(header.uri().path(), "/index/");
        assert_eq!(header.uri().query(), Some("a=1&b=2&a=3"));
        assert_eq!(header.headers().len(), 15);

        assert_eq!(header.headers().get(http::header::CONNECTION), Some(&HeaderValue::from_str("keep-alive").unwrap()));
        assert_eq!(
            header.headers().get("sec-ch-ua"),
            Some(&HeaderValue::from_str(r##""#Not_A Brand";v="99", "Microsoft Edge";v="109", "Chromium";v="109""##).unwrap())
        );
        assert_eq!(header.headers().get("sec-ch-ua-platform"), Some(&HeaderValue::from_str("\"macOS\"").unwrap()));
        assert_eq!(
            header.headers().get(http::header::ACCEPT_LANGUAGE),
            Some(&HeaderValue::from_str("zh-CN,zh;q=0.9,en-US;q=0.8,en;q=0.7").unwrap())
        );
    }

    #[test]
    fn partial_request_keeps_buffer() {
        let mut buf = BytesMut::from("POST /upload HTTP/1.1\r\nContent-Len");

        let result = RequestHeaderDecoder::default().decode(&mut buf).unwrap();

        assert!(result.is_none());
        assert_eq!(&buf[..], b"POST /upload HTTP/1.1\r\nContent-Len");
    }

    #[test]
    fn request_with_body_framing() {
        let mut buf = BytesMut::from("POST /upload HTTP/1.1\r\nContent-Length: 11\r\n\r\nhello world");

        let (header, payload_size) = RequestHeaderDecoder::default().decode(&mut buf).unwrap().unwrap();

        assert_eq!(header.method(), &Method::POST);
        assert_eq!(payload_size, PayloadSize::Length(11));
        assert_eq!(&buf[..], b"hello world");
    }

    #[test]
    fn oversized_partial_header_is_rejected() {
        let limits = HeaderLimits { max_header_bytes: 32, max_headers: 8 };
        let mut buf = BytesMut::from("GET / HTTP/1.1\r\nX-Padding: aaaaaaaaaaaaaaaaaaaaaaaa");

        let result = RequestHeaderDecoder::new(limits).decode(&mut buf);

        assert!(matches!(result, Err(ParseError::TooLargeHeader { max_size: 32, .. })));
    }

    #[test]
    fn too_many_headers_is_rejected() {
        let limits = HeaderLimits { max_header_bytes: 1024, max_headers: 1 };
        let mut buf = BytesMut::from("GET / HTTP/1.1\r\nHost: a\r\nAccept: */*\r\n\r\n");

        let result = RequestHeaderDecoder::new(limits).decode(&mut buf);

        assert!(matches!(result, Err(ParseError::TooManyHeaders { max_num: 1 })));
    }

    #[test]
    fn decode_response() {
        let str = indoc! {r##"
        HTTP/1.1 200 OK
        Content-Type: text/plain
        Content-Length: 23

        Your user id is : 1337
        "##};

        let mut buf = BytesMut::from(str);

        let (header, payload_size) = ResponseHeaderDecoder::default().decode(&mut buf).unwrap().unwrap();

        assert_eq!(header.status(), StatusCode::OK);
        assert_eq!(header.version(), Version::HTTP_11);
        assert_eq!(header.headers().get(http::header::CONTENT_TYPE), Some(&HeaderValue::from_static("text/plain")));
        assert_eq!(payload_size, PayloadSize::Length(23));
        assert_eq!(&buf[..], b"Your user id is : 1337\n");
    }

    #[test]
    fn decode_response_to_head_request() {
        let mut buf = BytesMut::from("HTTP/1.1 200 OK\r\nContent-Length: 23\r\n\r\n");

        let (_header, payload_size) = ResponseHeaderDecoder::new(HeaderLimits::default(), true).decode(&mut buf).unwrap().unwrap();

        assert!(payload_size.is_empty());
    }

    #[test]
    fn decode_close_delimited_response() {
        let mut buf = BytesMut::from("HTTP/1.0 200 OK\r\n\r\nabc");

        let (header, payload_size) = ResponseHeaderDecoder::default().decode(&mut buf).unwrap().unwrap();

        assert_eq!(header.version(), Version::HTTP_10);
        assert!(payload_size.is_close_delimited());
        assert_eq!(&buf[..], b"abc");
    }
}
