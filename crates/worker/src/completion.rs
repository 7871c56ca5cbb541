//! One-shot completion signal for cross-thread call-and-wait.
//!
//! A [`Completion`] is moved into work that runs on another thread; the
//! matching [`CompletionWaiter`] blocks (or awaits) until the value arrives.
//! Dropping the [`Completion`] without completing it wakes the waiter with
//! `None`, so a panicking task never leaves its caller hanging.

use tokio::sync::oneshot;

/// Sending half of a one-shot completion.
#[derive(Debug)]
pub struct Completion<T> {
	tx: oneshot::Sender<T>,
}

/// Receiving half of a one-shot completion.
#[derive(Debug)]
pub struct CompletionWaiter<T> {
	rx: oneshot::Receiver<T>,
}

/// Creates a linked completion pair.
pub fn completion<T>() -> (Completion<T>, CompletionWaiter<T>) {
	let (tx, rx) = oneshot::channel();
	(Completion { tx }, CompletionWaiter { rx })
}

impl<T> Completion<T> {
	/// Delivers the value. A waiter that already gave up is ignored.
	pub fn complete(self, value: T) {
		let _ = self.tx.send(value);
	}
}

impl<T> CompletionWaiter<T> {
	/// Blocks the current thread until the value arrives.
	///
	/// Must not be called from within an async execution context; use
	/// [`Self::wait_async`] there.
	pub fn wait(self) -> Option<T> {
		self.rx.blocking_recv().ok()
	}

	/// Waits for the value asynchronously.
	pub async fn wait_async(self) -> Option<T> {
		self.rx.await.ok()
	}
}
