//! Heartbeat-based liveness ladder for event loop threads.
//!
//! Each probe checks whether the heartbeat posted by the previous probe has
//! run, then posts a fresh one. Consecutive misses escalate the state.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Observed health of an event loop thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThreadState {
	/// The last heartbeat ran.
	Normal,
	/// At least one heartbeat was missed, below the deadlock threshold.
	Block,
	/// Heartbeats were missed `threshold` times in a row.
	Deadlock,
}

impl ThreadState {
	/// Classifies a run of consecutive misses against a threshold.
	pub fn from_misses(misses: u32, threshold: u32) -> Self {
		match misses {
			0 => Self::Normal,
			n if n >= threshold.max(1) => Self::Deadlock,
			_ => Self::Block,
		}
	}

	pub(crate) const fn as_str(self) -> &'static str {
		match self {
			Self::Normal => "normal",
			Self::Block => "block",
			Self::Deadlock => "deadlock",
		}
	}
}

/// Shared heartbeat bookkeeping for one event loop.
#[derive(Debug)]
pub(crate) struct Heartbeat {
	alive: AtomicBool,
	misses: AtomicU32,
}

impl Default for Heartbeat {
	fn default() -> Self {
		Self {
			alive: AtomicBool::new(true),
			misses: AtomicU32::new(0),
		}
	}
}

impl Heartbeat {
	/// Called on the event loop thread when a heartbeat task runs.
	pub fn mark_alive(&self) {
		self.alive.store(true, Ordering::Release);
	}

	/// Consumes the last heartbeat and returns the updated miss count.
	pub fn observe(&self) -> u32 {
		if self.alive.swap(false, Ordering::AcqRel) {
			self.misses.store(0, Ordering::Release);
			0
		} else {
			self.misses.fetch_add(1, Ordering::AcqRel).saturating_add(1)
		}
	}

	pub fn misses(&self) -> u32 {
		self.misses.load(Ordering::Acquire)
	}
}
