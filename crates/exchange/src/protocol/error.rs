use std::io;
use thiserror::Error;

/// Failure delivered by every exchange operation.
///
/// End-of-stream never shows up here from a body read: a peer close while reading a body
/// terminates the message instead of failing it.
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("transport error: {source}")]
    Transport {
        #[source]
        source: io::Error,
    },

    #[error("read deadline elapsed")]
    Timeout,

    #[error("connection closed by peer")]
    ConnectionClosed,

    #[error("parse error: {source}")]
    Parse {
        #[from]
        source: ParseError,
    },

    #[error("send error: {source}")]
    Send {
        #[from]
        source: SendError,
    },
}

impl From<io::Error> for ExchangeError {
    fn from(e: io::Error) -> Self {
        Self::from_io(e)
    }
}

/// Coarse classification of an [`ExchangeError`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Timeout,
    ConnectionClosed,
    Parse,
    Send,
}

impl ExchangeError {
    /// Classifies a transport failure: a `TimedOut` error raised by the transport
    /// when the shared deadline elapses becomes [`ExchangeError::Timeout`].
    pub fn from_io(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::TimedOut => Self::Timeout,
            _ => Self::Transport { source: e },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Timeout => ErrorKind::Timeout,
            Self::ConnectionClosed => ErrorKind::ConnectionClosed,
            Self::Parse { .. } => ErrorKind::Parse,
            Self::Send { .. } => ErrorKind::Send,
        }
    }

    #[inline]
    pub fn is_timeout(&self) -> bool {
        self.kind() == ErrorKind::Timeout
    }
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("header size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("header number exceed the limit {max_num}")]
    TooManyHeaders { max_num: usize },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid http version: {0:?}")]
    InvalidVersion(Option<u8>),

    #[error("invalid http method")]
    InvalidMethod,

    #[error("invalid http uri")]
    InvalidUri,

    #[error("invalid http status: {0:?}")]
    InvalidStatus(Option<u16>),

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("invalid chunk: {reason}")]
    InvalidChunk { reason: &'static str },

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("body size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeBody { current_size: u64, max_size: u64 },

    #[error("header parse is not complete")]
    HeaderIncomplete,

    #[error("connection closed before the header was complete")]
    UnexpectedEof,

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn too_many_headers(max_num: usize) -> Self {
        Self::TooManyHeaders { max_num }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn invalid_chunk(reason: &'static str) -> Self {
        Self::InvalidChunk { reason }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn too_large_body(current_size: u64, max_size: u64) -> Self {
        Self::TooLargeBody { current_size, max_size }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timed_out_io_is_classified_as_timeout() {
        let error = ExchangeError::from_io(io::Error::from(io::ErrorKind::TimedOut));
        assert!(error.is_timeout());

        let error = ExchangeError::from_io(io::Error::from(io::ErrorKind::ConnectionReset));
        assert_eq!(error.kind(), ErrorKind::Transport);
    }

    #[test]
    fn parse_error_converts_into_exchange_error() {
        let error: ExchangeError = ParseError::invalid_chunk("bad size").into();
        assert_eq!(error.kind(), ErrorKind::Parse);
        assert_eq!(error.to_string(), "parse error: invalid chunk: bad size");
    }
}
