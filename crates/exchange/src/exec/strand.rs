use std::fmt;

use futures::StreamExt;
use futures::channel::mpsc::{self, UnboundedSender};
use futures::future::BoxFuture;
use tokio::runtime::Handle;
use tracing::{error, trace};

use crate::exec::Executor;

/// A serialized execution context.
///
/// Tasks submitted to a strand run one after another, in submission order, each to
/// completion before the next one starts. Clones submit to the same queue.
///
/// The operations of this crate only submit the final completion call to a strand, so
/// operations bound to one strand still overlap their reads and writes.
#[derive(Clone)]
pub struct Strand {
    sender: UnboundedSender<BoxFuture<'static, ()>>,
}

impl Strand {
    /// Starts a strand whose tasks are driven on `handle`.
    pub fn new(handle: &Handle) -> Self {
        let (sender, mut receiver) = mpsc::unbounded::<BoxFuture<'static, ()>>();

        handle.spawn(async move {
            while let Some(task) = receiver.next().await {
                task.await;
            }
            trace!("strand drained, all handles dropped");
        });

        Self { sender }
    }

    /// Starts a strand on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime.
    pub fn current() -> Self {
        Self::new(&Handle::current())
    }
}

impl Executor for Strand {
    fn execute(&self, task: BoxFuture<'static, ()>) {
        if self.sender.unbounded_send(task).is_err() {
            error!("strand is stopped, dropping submitted task and the completion it carries");
        }
    }
}

impl fmt::Debug for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Strand").field("closed", &self.sender.is_closed()).finish()
    }
}
