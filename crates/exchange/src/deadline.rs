//! Read deadline shared between an operation and its transport.
//!
//! The operation only ever arms the [`Deadline`] before it starts a read. Enforcing it is
//! the job of the transport: [`TimedStream`] races each pending read against the current
//! expiry and fails the read with [`io::ErrorKind::TimedOut`] once it passes.

use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use pin_project_lite::pin_project;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::time::{Instant, Sleep};
use tracing::{debug, trace};

/// A resettable point in time after which pending reads fail.
///
/// Clones share the same expiry.
#[derive(Debug, Clone, Default)]
pub struct Deadline {
    expiry: Arc<Mutex<Option<Instant>>>,
}

impl Deadline {
    /// A disarmed deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the expiry to `duration` from now, replacing any previous expiry.
    pub fn arm(&self, duration: Duration) {
        let expiry = Instant::now().checked_add(duration);
        trace!(?duration, "arm read deadline");
        *self.lock() = expiry;
    }

    pub fn disarm(&self) {
        *self.lock() = None;
    }

    pub fn expiry(&self) -> Option<Instant> {
        *self.lock()
    }

    pub fn is_expired(&self) -> bool {
        self.expiry().is_some_and(|expiry| expiry <= Instant::now())
    }

    fn lock(&self) -> MutexGuard<'_, Option<Instant>> {
        // the guarded value is a plain instant, a panic while holding the lock cannot leave it torn
        self.expiry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pin_project! {
    /// A stream whose reads observe a shared [`Deadline`].
    ///
    /// Bytes that are already available always win over an elapsed deadline. Writes are
    /// passed through untouched.
    #[derive(Debug)]
    pub struct TimedStream<S> {
        #[pin]
        inner: S,
        deadline: Deadline,
        sleep: Option<Pin<Box<Sleep>>>,
    }
}

impl<S> TimedStream<S> {
    pub fn new(inner: S, deadline: Deadline) -> Self {
        Self { inner, deadline, sleep: None }
    }

    pub fn deadline(&self) -> &Deadline {
        &self.deadline
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: AsyncRead> AsyncRead for TimedStream<S> {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        let this = self.project();

        if let Poll::Ready(result) = this.inner.poll_read(cx, buf) {
            return Poll::Ready(result);
        }

        let Some(expiry) = this.deadline.expiry() else {
            *this.sleep = None;
            return Poll::Pending;
        };

        let sleep = this.sleep.get_or_insert_with(|| Box::pin(tokio::time::sleep_until(expiry)));
        if sleep.deadline() != expiry {
            sleep.as_mut().reset(expiry);
        }

        ready!(sleep.as_mut().poll(cx));
        debug!("read deadline elapsed, abort pending read");
        Poll::Ready(Err(io::Error::new(io::ErrorKind::TimedOut, "read deadline elapsed")))
    }
}

impl<S: AsyncWrite> AsyncWrite for TimedStream<S> {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        self.project().inner.poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.project().inner.poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.project().inner.poll_shutdown(cx)
    }

    fn poll_write_vectored(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        self.project().inner.poll_write_vectored(cx, bufs)
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }
}
