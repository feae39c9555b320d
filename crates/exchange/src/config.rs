//! Tunables shared by every operation running on a [`Session`](crate::Session).

use std::time::Duration;

/// Default per-read deadline, rearmed before every read of a body or head.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Default capacity reserved in the read buffer before each read.
pub const DEFAULT_READ_BUFFER_CAPACITY: usize = 8 * 1024;

/// Default upper bound of a message head in bytes.
pub const DEFAULT_MAX_HEADER_BYTES: usize = 8 * 1024;

/// Default maximum number of header fields.
pub const DEFAULT_MAX_HEADERS: usize = 64;

/// Configuration of an exchange session.
///
/// ```
/// use std::time::Duration;
/// use micro_exchange::ExchangeConfig;
///
/// let config = ExchangeConfig::default()
///     .with_read_timeout(Duration::from_secs(5))
///     .with_max_body_bytes(Some(1024 * 1024));
/// assert_eq!(config.read_timeout, Duration::from_secs(5));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeConfig {
    /// Budget of a single read. The deadline is armed again before every read, so a slow
    /// but steady peer never trips it.
    pub read_timeout: Duration,
    pub read_buffer_capacity: usize,
    pub max_header_bytes: usize,
    pub max_headers: usize,
    /// Upper bound of a body announced or accumulated, `None` leaves it to the body policy.
    pub max_body_bytes: Option<u64>,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            read_timeout: DEFAULT_READ_TIMEOUT,
            read_buffer_capacity: DEFAULT_READ_BUFFER_CAPACITY,
            max_header_bytes: DEFAULT_MAX_HEADER_BYTES,
            max_headers: DEFAULT_MAX_HEADERS,
            max_body_bytes: None,
        }
    }
}

impl ExchangeConfig {
    #[must_use]
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    #[must_use]
    pub fn with_read_buffer_capacity(mut self, capacity: usize) -> Self {
        self.read_buffer_capacity = capacity.max(1);
        self
    }

    #[must_use]
    pub fn with_max_header_bytes(mut self, max_header_bytes: usize) -> Self {
        self.max_header_bytes = max_header_bytes;
        self
    }

    #[must_use]
    pub fn with_max_headers(mut self, max_headers: usize) -> Self {
        self.max_headers = max_headers;
        self
    }

    #[must_use]
    pub fn with_max_body_bytes(mut self, max_body_bytes: Option<u64>) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ExchangeConfig::default();
        assert_eq!(config.read_timeout, Duration::from_secs(30));
        assert_eq!(config.read_buffer_capacity, 8192);
        assert_eq!(config.max_body_bytes, None);
    }

    #[test]
    fn read_buffer_capacity_never_zero() {
        assert_eq!(ExchangeConfig::default().with_read_buffer_capacity(0).read_buffer_capacity, 1);
    }
}
