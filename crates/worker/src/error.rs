//! Error types for task queues.

use thiserror::Error;

/// Errors surfaced by [`TaskQueue`](crate::TaskQueue) operations.
#[derive(Debug, Error)]
pub enum QueueError {
	/// The queue was shut down and accepts no more work.
	#[error("task queue {queue} is closed")]
	Closed {
		/// Name of the queue.
		queue: String,
	},

	/// The event loop thread could not be started.
	#[error("failed to spawn event loop thread for {queue}: {error}")]
	Spawn {
		/// Name of the queue.
		queue: String,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// A synchronous call finished without producing a value.
	///
	/// This happens when the posted closure panicked on the queue thread.
	#[error("task on queue {queue} finished without a result")]
	Abandoned {
		/// Name of the queue.
		queue: String,
	},
}

/// Result type for queue operations.
pub type Result<T> = std::result::Result<T, QueueError>;
