use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::queue::{QueueShared, QueueSnapshot, TaskQueue};

/// In-memory registry of live task queues for status snapshots.
///
/// Holds weak references only; queues that have been dropped disappear from
/// the next snapshot.
#[derive(Debug, Default, Clone)]
pub struct QueueRegistry {
	inner: Arc<RwLock<HashMap<u64, Weak<QueueShared>>>>,
}

impl QueueRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Tracks one queue.
	pub fn register(&self, queue: &TaskQueue) {
		self.inner.write().insert(queue.id(), Arc::downgrade(queue.shared()));
	}

	/// Returns snapshots of live queues sorted by name, then id.
	pub fn snapshots(&self) -> Vec<QueueSnapshot> {
		let mut guard = self.inner.write();
		guard.retain(|_, shared| shared.strong_count() > 0);
		let mut snapshots: Vec<_> = guard.values().filter_map(Weak::upgrade).map(|shared| shared.snapshot()).collect();
		snapshots.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
		snapshots
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn snapshots_follow_queue_lifetimes() {
		let registry = QueueRegistry::new();
		let beta = TaskQueue::new("beta").unwrap();
		let alpha = TaskQueue::new("alpha").unwrap();
		registry.register(&beta);
		registry.register(&alpha);

		alpha.call(|| ()).unwrap();
		alpha.call(|| ()).unwrap();
		let names: Vec<_> = registry.snapshots().into_iter().map(|s| s.name).collect();
		assert_eq!(names, vec!["alpha".to_string(), "beta".to_string()]);

		drop(beta);
		let snapshots = registry.snapshots();
		assert_eq!(snapshots.len(), 1);
		assert_eq!(snapshots[0].name, "alpha");
		assert!(snapshots[0].executed >= 1);
	}
}
