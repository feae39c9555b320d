//! Execution contexts and completion handlers.
//!
//! Operations started in continuation-passing style report to a [`Completion`]. The
//! completion decides where it runs through [`Completion::executor`] and which
//! [`Allocator`](crate::Allocator) builds its result through [`Completion::allocator`].

mod completion;
mod executor;
mod strand;

pub use completion::{BindAllocator, BindExecutor, Completion, CompletionFn, bind_allocator, bind_executor, completion_fn};
pub use executor::Executor;
pub use strand::Strand;
