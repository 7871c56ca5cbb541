//! Single-threaded FIFO event loop.
//!
//! A [`TaskQueue`] owns one dedicated OS thread that runs posted closures
//! strictly in submission order. Work that must observe state owned by the
//! loop thread goes through [`TaskQueue::call`], which blocks the caller on a
//! one-shot [`Completion`](crate::Completion) until the closure has run.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::thread::{JoinHandle, ThreadId};

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::completion::completion;
use crate::error::{QueueError, Result};
use crate::liveness::{Heartbeat, ThreadState};
use crate::panic::panic_message;
use crate::{TaskClass, spawn_named_thread};


type Task = Box<dyn FnOnce() + Send + 'static>;

static NEXT_QUEUE_ID: AtomicU64 = AtomicU64::new(1);

/// State shared between a queue handle, its loop thread and the registry.
#[derive(Debug)]
pub(crate) struct QueueShared {
	pub(crate) id: u64,
	pub(crate) name: String,
	pub(crate) class: TaskClass,
	pub(crate) pending: AtomicUsize,
	pub(crate) executed: AtomicU64,
	pub(crate) closed: AtomicBool,
	pub(crate) heartbeat: Heartbeat,
}

impl QueueShared {
	pub(crate) fn snapshot(&self) -> QueueSnapshot {
		QueueSnapshot {
			id: self.id,
			name: self.name.clone(),
			class: self.class,
			pending: self.pending.load(Ordering::Acquire),
			executed: self.executed.load(Ordering::Acquire),
			missed_heartbeats: self.heartbeat.misses(),
			closed: self.closed.load(Ordering::Acquire),
		}
	}
}

/// Point-in-time view of one queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSnapshot {
	pub id: u64,
	pub name: String,
	pub class: TaskClass,
	pub pending: usize,
	pub executed: u64,
	pub missed_heartbeats: u32,
	pub closed: bool,
}

/// Dedicated single-threaded event loop with FIFO ordering.
///
/// Dropping the queue closes it, drains already-posted tasks and joins the
/// loop thread.
pub struct TaskQueue {
	shared: Arc<QueueShared>,
	thread_id: ThreadId,
	tx: Mutex<Option<mpsc::UnboundedSender<Task>>>,
	join: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for TaskQueue {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TaskQueue")
			.field("id", &self.shared.id)
			.field("name", &self.shared.name)
			.field("pending", &self.pending())
			.field("closed", &self.is_closed())
			.finish()
	}
}

impl TaskQueue {
	/// Starts a render-class event loop on a thread named `name`.
	pub fn new(name: impl Into<String>) -> Result<Self> {
		Self::with_class(TaskClass::Render, name)
	}

	/// Starts an event loop of the given class on a thread named `name`.
	pub fn with_class(class: TaskClass, name: impl Into<String>) -> Result<Self> {
		let name = name.into();
		let shared = Arc::new(QueueShared {
			id: NEXT_QUEUE_ID.fetch_add(1, Ordering::Relaxed),
			name: name.clone(),
			class,
			pending: AtomicUsize::new(0),
			executed: AtomicU64::new(0),
			closed: AtomicBool::new(false),
			heartbeat: Heartbeat::default(),
		});
		let (tx, rx) = mpsc::unbounded_channel::<Task>();
		let loop_shared = Arc::clone(&shared);
		let join = spawn_named_thread(class, name.clone(), move || run_event_loop(&loop_shared, rx)).map_err(|error| QueueError::Spawn {
			queue: name.clone(),
			error,
		})?;
		let thread_id = join.thread().id();
		tracing::debug!(queue = %name, id = shared.id, worker_class = class.as_str(), "worker.queue.start");

		Ok(Self {
			shared,
			thread_id,
			tx: Mutex::new(Some(tx)),
			join: Mutex::new(Some(join)),
		})
	}

	/// Queue name, also used as the loop thread name.
	pub fn name(&self) -> &str {
		&self.shared.name
	}

	/// Process-unique queue id. Queues started later get larger ids.
	pub fn id(&self) -> u64 {
		self.shared.id
	}

	/// Number of posted tasks that have not started yet.
	pub fn pending(&self) -> usize {
		self.shared.pending.load(Ordering::Acquire)
	}

	/// Number of tasks that have finished, including panicked ones.
	pub fn executed(&self) -> u64 {
		self.shared.executed.load(Ordering::Acquire)
	}

	/// Returns true once [`Self::shutdown`] has been requested.
	pub fn is_closed(&self) -> bool {
		self.shared.closed.load(Ordering::Acquire)
	}

	/// Returns true when called from this queue's loop thread.
	pub fn is_current(&self) -> bool {
		std::thread::current().id() == self.thread_id
	}

	/// Enqueues fire-and-forget work.
	pub fn post<F>(&self, task: F) -> Result<()>
	where
		F: FnOnce() + Send + 'static,
	{
		let guard = self.tx.lock();
		let Some(tx) = guard.as_ref() else {
			return Err(self.closed_error());
		};
		self.shared.pending.fetch_add(1, Ordering::AcqRel);
		if tx.send(Box::new(task)).is_err() {
			self.shared.pending.fetch_sub(1, Ordering::AcqRel);
			return Err(self.closed_error());
		}
		tracing::trace!(queue = %self.shared.name, pending = self.pending(), "worker.queue.post");
		Ok(())
	}

	/// Runs `task` on the loop thread and blocks until it returns its value.
	///
	/// Called from the loop thread itself, the task runs inline. Must not be
	/// called from within an async execution context; see [`Self::call_async`].
	pub fn call<F, R>(&self, task: F) -> Result<R>
	where
		F: FnOnce() -> R + Send + 'static,
		R: Send + 'static,
	{
		if self.is_current() {
			return Ok(task());
		}
		let (done, waiter) = completion();
		self.post(move || done.complete(task()))?;
		waiter.wait().ok_or_else(|| self.abandoned_error())
	}

	/// Async flavour of [`Self::call`].
	pub async fn call_async<F, R>(&self, task: F) -> Result<R>
	where
		F: FnOnce() -> R + Send + 'static,
		R: Send + 'static,
	{
		let (done, waiter) = completion();
		self.post(move || done.complete(task()))?;
		waiter.wait_async().await.ok_or_else(|| self.abandoned_error())
	}

	/// Checks the heartbeat posted by the previous probe and posts a new one.
	///
	/// `threshold` consecutive misses classify the loop as deadlocked.
	pub fn probe(&self, threshold: u32) -> ThreadState {
		let misses = self.shared.heartbeat.observe();
		let state = ThreadState::from_misses(misses, threshold);
		let shared = Arc::clone(&self.shared);
		if let Err(err) = self.post(move || shared.heartbeat.mark_alive()) {
			tracing::debug!(queue = %self.shared.name, error = %err, "worker.queue.probe_skipped");
		}
		if state != ThreadState::Normal {
			tracing::warn!(queue = %self.shared.name, misses, state = state.as_str(), "worker.queue.heartbeat_missed");
		}
		state
	}

	/// Returns a point-in-time snapshot of this queue.
	pub fn snapshot(&self) -> QueueSnapshot {
		self.shared.snapshot()
	}

	/// Closes the queue, lets the loop drain posted tasks and joins its thread.
	///
	/// From the loop thread itself the join is skipped; the loop exits after
	/// the current task returns.
	pub fn shutdown(&self) {
		let tx = self.tx.lock().take();
		if tx.is_some() {
			self.shared.closed.store(true, Ordering::Release);
			tracing::debug!(queue = %self.shared.name, pending = self.pending(), "worker.queue.shutdown");
		}
		drop(tx);

		if self.is_current() {
			return;
		}
		let join = self.join.lock().take();
		if let Some(join) = join
			&& join.join().is_err()
		{
			tracing::error!(queue = %self.shared.name, "worker.queue.join_failed");
		}
	}

	pub(crate) fn shared(&self) -> &Arc<QueueShared> {
		&self.shared
	}

	fn closed_error(&self) -> QueueError {
		QueueError::Closed {
			queue: self.shared.name.clone(),
		}
	}

	fn abandoned_error(&self) -> QueueError {
		QueueError::Abandoned {
			queue: self.shared.name.clone(),
		}
	}
}

impl Drop for TaskQueue {
	fn drop(&mut self) {
		self.shutdown();
	}
}

fn run_event_loop(shared: &QueueShared, mut rx: mpsc::UnboundedReceiver<Task>) {
	while let Some(task) = rx.blocking_recv() {
		shared.pending.fetch_sub(1, Ordering::AcqRel);
		if let Err(payload) = catch_unwind(AssertUnwindSafe(task)) {
			let message = panic_message(payload.as_ref()).unwrap_or_else(|| "opaque panic payload".to_string());
			tracing::error!(queue = %shared.name, %message, "worker.queue.task_panicked");
		}
		shared.executed.fetch_add(1, Ordering::AcqRel);
	}
	tracing::debug!(queue = %shared.name, executed = shared.executed.load(Ordering::Acquire), "worker.queue.exit");
}
