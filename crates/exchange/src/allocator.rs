//! Storage providers for message bodies.
//!
//! An operation takes its allocator from the completion handler it reports to, so a
//! caller can route every body buffer of an exchange through its own pool or arena.

use std::fmt;

use bytes::BytesMut;

/// Source of body storage.
pub trait Allocator: fmt::Debug + Clone + Send + Sync + 'static {
    /// Returns an empty buffer able to hold at least `capacity` bytes.
    fn allocate(&self, capacity: usize) -> BytesMut;
}

/// The process heap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Global;

impl Allocator for Global {
    #[inline]
    fn allocate(&self, capacity: usize) -> BytesMut {
        BytesMut::with_capacity(capacity)
    }
}
