//! Host identities and per-form host reference counting.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::form::FormId;

/// Opaque handle to an object that lives on the other side of the IPC boundary.
///
/// Equality and hashing use the identity of the shared allocation, never the
/// payload, so two handles are equal only if one was cloned from the other.
#[derive(Clone)]
pub struct RemoteObject {
	inner: Arc<dyn Any + Send + Sync>,
}

impl RemoteObject {
	/// Wraps a payload in a fresh identity.
	pub fn new<T: Any + Send + Sync>(payload: T) -> Self {
		Self { inner: Arc::new(payload) }
	}

	/// Wraps an already shared payload; clones of `inner` share the identity.
	pub fn from_arc(inner: Arc<dyn Any + Send + Sync>) -> Self {
		Self { inner }
	}

	/// Borrows the payload if it has type `T`.
	pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
		self.inner.downcast_ref::<T>()
	}

	fn addr(&self) -> usize {
		Arc::as_ptr(&self.inner).cast::<()>() as usize
	}
}

impl PartialEq for RemoteObject {
	fn eq(&self, other: &Self) -> bool {
		self.addr() == other.addr()
	}
}

impl Eq for RemoteObject {}

impl Hash for RemoteObject {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.addr().hash(state);
	}
}

impl fmt::Debug for RemoteObject {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "RemoteObject({:#x})", self.addr())
	}
}

/// Identity of a host process displaying forms.
pub type HostToken = RemoteObject;

/// Identity of the caller of a dispatcher operation.
pub type CallerToken = RemoteObject;

/// Hosts referencing each form of one record.
///
/// Guarded by its own lock so host bookkeeping never waits behind the
/// record's task queue. Forms whose host set becomes empty are dropped from
/// the map immediately.
#[derive(Debug, Default)]
pub struct HostReferenceSet {
	hosts: Mutex<HashMap<FormId, HashSet<HostToken>>>,
}

impl HostReferenceSet {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `host` for `form_id`. Returns false if it was already present.
	pub fn insert(&self, form_id: FormId, host: HostToken) -> bool {
		self.hosts.lock().entry(form_id).or_default().insert(host)
	}

	/// Unregisters `host` from `form_id`. Returns false for non-members.
	pub fn remove(&self, form_id: FormId, host: &HostToken) -> bool {
		let mut hosts = self.hosts.lock();
		let Some(set) = hosts.get_mut(&form_id) else {
			return false;
		};
		let removed = set.remove(host);
		if set.is_empty() {
			hosts.remove(&form_id);
		}
		removed
	}

	/// Unregisters `host` from every form and returns the forms left without hosts.
	pub fn remove_host(&self, host: &HostToken) -> Vec<FormId> {
		let mut hosts = self.hosts.lock();
		let mut orphaned = Vec::new();
		hosts.retain(|form_id, set| {
			set.remove(host);
			if set.is_empty() {
				orphaned.push(*form_id);
				false
			} else {
				true
			}
		});
		orphaned.sort_unstable();
		orphaned
	}

	/// Drops all references to `form_id`.
	pub fn forget(&self, form_id: FormId) {
		self.hosts.lock().remove(&form_id);
	}

	pub fn contains(&self, form_id: FormId, host: &HostToken) -> bool {
		self.hosts.lock().get(&form_id).is_some_and(|set| set.contains(host))
	}

	/// Number of hosts referencing `form_id`.
	pub fn count(&self, form_id: FormId) -> usize {
		self.hosts.lock().get(&form_id).map_or(0, HashSet::len)
	}

	pub fn is_empty(&self) -> bool {
		self.hosts.lock().is_empty()
	}

	/// Forms with at least one host, ascending.
	pub fn form_ids(&self) -> Vec<FormId> {
		let mut ids: Vec<_> = self.hosts.lock().keys().copied().collect();
		ids.sort_unstable();
		ids
	}

	pub fn clear(&self) {
		self.hosts.lock().clear();
	}
}
