#![allow(dead_code, reason = "every test binary uses a different part of the helpers")]

use std::collections::VecDeque;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::BytesMut;
use micro_exchange::Allocator;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::time::Sleep;

/// One scripted outcome of the stream's reads.
#[derive(Debug)]
pub enum Step {
    /// Bytes handed out by as many reads as it takes.
    Data(Vec<u8>),
    /// Nothing happens for this long.
    Wait(Duration),
    /// The next read fails.
    Error(io::ErrorKind),
    /// Every read from here on reports end-of-stream.
    Eof,
    /// Reads never complete.
    Hang,
}

pub fn data(bytes: impl Into<Vec<u8>>) -> Step {
    Step::Data(bytes.into())
}

/// An in-memory stream replaying a script of read outcomes and recording writes.
#[derive(Debug)]
pub struct ScriptedStream {
    steps: VecDeque<Step>,
    sleep: Option<Pin<Box<Sleep>>>,
    written: Arc<Mutex<Vec<u8>>>,
    reads: Arc<AtomicUsize>,
    write_error: Option<io::ErrorKind>,
}

impl ScriptedStream {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
            sleep: None,
            written: Arc::default(),
            reads: Arc::default(),
            write_error: None,
        }
    }

    pub fn failing_writes(mut self, kind: io::ErrorKind) -> Self {
        self.write_error = Some(kind);
        self
    }

    /// Everything written so far, shared with the stream.
    pub fn written(&self) -> Arc<Mutex<Vec<u8>>> {
        Arc::clone(&self.written)
    }

    /// Number of reads that completed, shared with the stream.
    pub fn reads(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.reads)
    }
}

impl AsyncRead for ScriptedStream {
    fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        let this = &mut *self;

        loop {
            match this.steps.front_mut() {
                Some(Step::Data(bytes)) => {
                    let amt = bytes.len().min(buf.remaining());
                    buf.put_slice(&bytes[..amt]);
                    bytes.drain(..amt);
                    if bytes.is_empty() {
                        this.steps.pop_front();
                    }
                    this.reads.fetch_add(1, Ordering::SeqCst);
                    return Poll::Ready(Ok(()));
                }
                Some(Step::Wait(duration)) => {
                    let duration = *duration;
                    let sleep = this.sleep.get_or_insert_with(|| Box::pin(tokio::time::sleep(duration)));
                    if sleep.as_mut().poll(cx).is_pending() {
                        return Poll::Pending;
                    }
                    this.sleep = None;
                    this.steps.pop_front();
                }
                Some(Step::Error(kind)) => {
                    let kind = *kind;
                    this.steps.pop_front();
                    this.reads.fetch_add(1, Ordering::SeqCst);
                    return Poll::Ready(Err(io::Error::from(kind)));
                }
                Some(Step::Hang) => return Poll::Pending,
                Some(Step::Eof) | None => {
                    this.reads.fetch_add(1, Ordering::SeqCst);
                    return Poll::Ready(Ok(()));
                }
            }
        }
    }
}

impl AsyncWrite for ScriptedStream {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        if let Some(kind) = self.write_error {
            return Poll::Ready(Err(io::Error::from(kind)));
        }
        self.written.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// Allocator counting the buffers it hands out.
#[derive(Debug, Clone, Default)]
pub struct CountingAllocator {
    allocations: Arc<AtomicUsize>,
}

impl CountingAllocator {
    pub fn allocations(&self) -> usize {
        self.allocations.load(Ordering::SeqCst)
    }
}

impl Allocator for CountingAllocator {
    fn allocate(&self, capacity: usize) -> BytesMut {
        self.allocations.fetch_add(1, Ordering::SeqCst);
        BytesMut::with_capacity(capacity)
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().with_max_level(tracing::Level::DEBUG).try_init();
}
