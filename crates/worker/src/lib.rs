//! Thread and task-queue primitives for the form render service.
//!
//! * [`TaskQueue`]: a dedicated single-threaded FIFO event loop.
//! * [`TaskQueue::call`]: the synchronous post-and-wait hand-off, built on [`Completion`].
//! * [`ThreadState`]: heartbeat liveness ladder for event loops.
//! * [`QueueRegistry`]: status snapshots of live queues.

mod class;
mod completion;
pub mod error;
mod liveness;
mod panic;
mod queue;
mod registry;
mod spawn;

pub use class::TaskClass;
pub use completion::{Completion, CompletionWaiter, completion};
pub use error::{QueueError, Result};
pub use liveness::ThreadState;
pub use queue::{QueueSnapshot, TaskQueue};
pub use registry::QueueRegistry;
pub use spawn::spawn_named_thread;
