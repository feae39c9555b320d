//! Continuations receiving the result of an operation.
//!
//! A [`Completion`] is invoked exactly once. Besides the callable itself it may carry an
//! execution context the result must be delivered on, and the allocator the result must
//! be built with.

use std::fmt;
use std::sync::Arc;

use crate::allocator::{Allocator, Global};
use crate::exec::Executor;

/// Single-shot receiver of a `T`.
pub trait Completion<T>: Send + 'static {
    type Allocator: Allocator;

    /// The execution context this completion must run on, `None` leaves the choice to
    /// the operation.
    fn executor(&self) -> Option<Arc<dyn Executor>> {
        None
    }

    fn allocator(&self) -> Self::Allocator;

    fn complete(self, result: T);
}

/// Completion calling a closure, see [`completion_fn`].
pub struct CompletionFn<F> {
    f: F,
}

/// Wraps a closure as a [`Completion`] with no executor preference and the [`Global`] allocator.
pub fn completion_fn<F>(f: F) -> CompletionFn<F> {
    CompletionFn { f }
}

impl<T, F> Completion<T> for CompletionFn<F>
where
    F: FnOnce(T) + Send + 'static,
{
    type Allocator = Global;

    fn allocator(&self) -> Global {
        Global
    }

    fn complete(self, result: T) {
        (self.f)(result);
    }
}

impl<F> fmt::Debug for CompletionFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionFn").finish_non_exhaustive()
    }
}

/// A completion bound to an execution context, see [`bind_executor`].
pub struct BindExecutor<C> {
    executor: Arc<dyn Executor>,
    inner: C,
}

/// Binds `completion` to `executor`: the result is delivered there.
pub fn bind_executor<E: Executor, C>(executor: E, completion: C) -> BindExecutor<C> {
    BindExecutor { executor: Arc::new(executor), inner: completion }
}

impl<T, C: Completion<T>> Completion<T> for BindExecutor<C> {
    type Allocator = C::Allocator;

    fn executor(&self) -> Option<Arc<dyn Executor>> {
        Some(Arc::clone(&self.executor))
    }

    fn allocator(&self) -> C::Allocator {
        self.inner.allocator()
    }

    fn complete(self, result: T) {
        self.inner.complete(result);
    }
}

impl<C: fmt::Debug> fmt::Debug for BindExecutor<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindExecutor").field("inner", &self.inner).finish_non_exhaustive()
    }
}

/// A completion carrying its own allocator, see [`bind_allocator`].
#[derive(Debug)]
pub struct BindAllocator<A, C> {
    allocator: A,
    inner: C,
}

/// Makes results delivered to `completion` be built with `allocator`.
pub fn bind_allocator<A: Allocator, C>(allocator: A, completion: C) -> BindAllocator<A, C> {
    BindAllocator { allocator, inner: completion }
}

impl<T, A: Allocator, C: Completion<T>> Completion<T> for BindAllocator<A, C> {
    type Allocator = A;

    fn executor(&self) -> Option<Arc<dyn Executor>> {
        self.inner.executor()
    }

    fn allocator(&self) -> A {
        self.allocator.clone()
    }

    fn complete(self, result: T) {
        self.inner.complete(result);
    }
}
