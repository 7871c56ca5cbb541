//! Renderer groups of one record, keyed by form id.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::capability::{FormRuntime, RenderBackend, RendererGroup};
use crate::config::Configuration;
use crate::context::RenderContext;
use crate::error::BackendError;
use crate::form::{FormId, FormJsInfo};
use crate::want::RenderRequest;

/// Owns every live renderer group of a record.
///
/// An entry exists iff the form has been rendered and not yet torn down.
/// Mutation happens on the record's event loop; the lock lets other threads
/// query emptiness and membership. Group calls run under the lock, backend
/// group creation does not.
#[derive(Default)]
pub struct RendererGroupRegistry {
	groups: Mutex<HashMap<FormId, Box<dyn RendererGroup>>>,
}

impl std::fmt::Debug for RendererGroupRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RendererGroupRegistry").field("forms", &self.form_ids()).finish()
	}
}

impl RendererGroupRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds `form` to its group, creating the group on the form's first render.
	pub fn add_form(
		&self,
		form: &FormJsInfo,
		request: &RenderRequest,
		context: &Arc<RenderContext>,
		runtime: &Arc<dyn FormRuntime>,
		backend: &dyn RenderBackend,
	) -> Result<(), BackendError> {
		let mut groups = self.groups.lock();
		if let Some(group) = groups.get_mut(&form.form_id) {
			group.add_form(form, request);
			return Ok(());
		}
		drop(groups);

		// Built unlocked; only the owning event loop inserts.
		let mut group = backend.create_renderer_group(form, context, runtime)?;
		group.add_form(form, request);
		tracing::debug!(form_id = %form.form_id, "Renderer group created.");
		self.groups.lock().insert(form.form_id, group);
		Ok(())
	}

	/// Pushes new data into an existing group. Returns false if there is none.
	pub fn update_form(&self, form: &FormJsInfo) -> bool {
		match self.groups.lock().get_mut(&form.form_id) {
			Some(group) => {
				group.update_form(form);
				true
			}
			None => false,
		}
	}

	/// Removes one component. Returns false if the form has no group.
	pub fn delete_component(&self, form_id: FormId, comp_id: &str) -> bool {
		match self.groups.lock().get_mut(&form_id) {
			Some(group) => {
				group.delete_component(comp_id);
				true
			}
			None => false,
		}
	}

	/// Tears down and drops the form's group. Returns false if there is none.
	pub fn remove(&self, form_id: FormId) -> bool {
		let removed = self.groups.lock().remove(&form_id);
		match removed {
			Some(mut group) => {
				group.delete_form();
				true
			}
			None => false,
		}
	}

	/// Reloads the form's group. Returns false if there is none.
	pub fn reload(&self, form_id: FormId) -> bool {
		match self.groups.lock().get_mut(&form_id) {
			Some(group) => {
				group.reload_form();
				true
			}
			None => false,
		}
	}

	pub fn update_configuration(&self, delta: &Configuration) {
		for group in self.groups.lock().values_mut() {
			group.update_configuration(delta);
		}
	}

	pub fn contains(&self, form_id: FormId) -> bool {
		self.groups.lock().contains_key(&form_id)
	}

	pub fn is_empty(&self) -> bool {
		self.groups.lock().is_empty()
	}

	pub fn len(&self) -> usize {
		self.groups.lock().len()
	}

	/// Forms with a live group, ascending.
	pub fn form_ids(&self) -> Vec<FormId> {
		let mut ids: Vec<_> = self.groups.lock().keys().copied().collect();
		ids.sort_unstable();
		ids
	}

	/// Tears down and drops every group.
	pub fn clear(&self) {
		let groups = std::mem::take(&mut *self.groups.lock());
		for (_, mut group) in groups {
			group.delete_form();
		}
	}
}
