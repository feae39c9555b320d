use futures::future::BoxFuture;
use tokio::runtime::Handle;

/// An execution context tasks can be submitted to.
///
/// Submitting never runs the task inline, the task starts on a later turn of the
/// context's scheduler.
///
/// An executor that can no longer run tasks (a runtime shutting down, a [`Strand`] whose
/// driver stopped) drops the task. A completion carried by that task is then dropped
/// without being invoked, the one case where an operation reports zero times instead of
/// once. [`Strand`] logs it at `error` level.
///
/// [`Strand`]: crate::exec::Strand
pub trait Executor: Send + Sync + 'static {
    fn execute(&self, task: BoxFuture<'static, ()>);
}

impl Executor for Handle {
    fn execute(&self, task: BoxFuture<'static, ()>) {
        self.spawn(task);
    }
}
