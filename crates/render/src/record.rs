//! Per-(bundle, uid) execution context.
//!
//! A [`FormRenderRecord`] owns one event loop. Everything that touches the
//! embedded runtime, module contexts or renderer groups runs on that loop in
//! submission order. Host references live outside the loop under their own
//! lock so host bookkeeping is visible immediately and never waits behind a
//! slow render.

use std::collections::HashSet;
use std::sync::Arc;

use formrender_worker::{QueueSnapshot, TaskQueue, ThreadState};
use parking_lot::{Mutex, RwLock};

use crate::capability::{FormRuntime, RenderBackend};
use crate::config::{Configuration, ServiceConfig};
use crate::context::RenderContextCache;
use crate::error::{Error, Result};
use crate::form::{FormId, FormJsInfo, RecordKey, RenderType};
use crate::group::RendererGroupRegistry;
use crate::host::{HostReferenceSet, HostToken};
use crate::runtime::RuntimeOptions;
use crate::want::RenderRequest;

/// How a whole-form deletion treats hosts that still reference the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Teardown {
	/// Tear the group down regardless of remaining hosts.
	Force,
	/// Keep the group while any host still references the form.
	IfUnreferenced,
}

/// State touched from the event loop.
struct RecordState {
	uid: RecordKey,
	event_runner: String,
	backend: Arc<dyn RenderBackend>,
	runtime: Mutex<Option<Arc<dyn FormRuntime>>>,
	configuration: RwLock<Configuration>,
	contexts: RenderContextCache,
	groups: RendererGroupRegistry,
	hosts: HostReferenceSet,
	/// Forms whose teardown was queued because their last host died.
	pending_teardown: Mutex<HashSet<FormId>>,
}

/// Rendering state of every form belonging to one `(bundle, uid)`.
pub struct FormRenderRecord {
	uid: RecordKey,
	bundle_name: String,
	block_threshold: u32,
	state: Arc<RecordState>,
	queue: TaskQueue,
}

impl std::fmt::Debug for FormRenderRecord {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FormRenderRecord")
			.field("uid", &self.uid)
			.field("bundle_name", &self.bundle_name)
			.field("generation", &self.generation())
			.field("queue", &self.queue)
			.finish_non_exhaustive()
	}
}

impl FormRenderRecord {
	/// Builds a record and starts its event loop.
	pub fn create(bundle_name: &str, uid: RecordKey, backend: Arc<dyn RenderBackend>, settings: &ServiceConfig) -> Result<Self> {
		let queue = TaskQueue::new(settings.queue_name(uid.as_str()))?;
		let state = Arc::new(RecordState {
			uid: uid.clone(),
			event_runner: queue.name().to_string(),
			backend,
			runtime: Mutex::new(None),
			configuration: RwLock::new(Configuration::default()),
			contexts: RenderContextCache::new(),
			groups: RendererGroupRegistry::new(),
			hosts: HostReferenceSet::new(),
			pending_teardown: Mutex::new(HashSet::new()),
		});
		tracing::debug!(uid = %uid, bundle = bundle_name, generation = queue.id(), "Render record created.");
		Ok(Self {
			uid,
			bundle_name: bundle_name.to_string(),
			block_threshold: settings.watchdog.block_threshold,
			state,
			queue,
		})
	}

	pub fn uid(&self) -> &RecordKey {
		&self.uid
	}

	pub fn bundle_name(&self) -> &str {
		&self.bundle_name
	}

	/// Lifecycle id, taken from the record's event loop. A record recreated
	/// for the same uid gets a larger one.
	pub fn generation(&self) -> u64 {
		self.queue.id()
	}

	/// Replaces the configuration snapshot used for contexts built later.
	pub fn set_configuration(&self, configuration: Configuration) {
		*self.state.configuration.write() = configuration;
	}

	pub fn configuration(&self) -> Configuration {
		self.state.configuration.read().clone()
	}

	/// Registers the host and queues the render or update.
	///
	/// The host reference is visible as soon as this returns; the render
	/// itself happens later on the event loop.
	pub fn update_render_record(&self, form: &FormJsInfo, request: &RenderRequest) -> Result<()> {
		let Some(host) = request.host_token.clone() else {
			tracing::error!(uid = %self.uid, form_id = %form.form_id, "Host token is null, refusing to render.");
			return Err(Error::MissingHostToken { form_id: form.form_id.0 });
		};
		let inserted = self.state.hosts.insert(form.form_id, host.clone());

		let state = Arc::clone(&self.state);
		let form_id = form.form_id;
		let form = form.clone();
		let request = request.clone();
		if let Err(err) = self.queue.post(move || state.handle_update(&form, &request)) {
			tracing::error!(uid = %self.uid, form_id = %form_id, error = %err, "Failed to queue render task.");
			if inserted {
				self.state.hosts.remove(form_id, &host);
			}
			return Err(err.into());
		}
		Ok(())
	}

	/// Removes `host` from the form and deletes a component or the whole form.
	///
	/// Blocks until the event loop has applied the deletion. Returns true only
	/// if the form's renderer group was torn down completely.
	pub fn delete_render_record(&self, form_id: FormId, comp_id: Option<&str>, host: Option<&HostToken>) -> Result<bool> {
		if let Some(host) = host {
			self.state.hosts.remove(form_id, host);
		}
		let teardown = if host.is_some() { Teardown::IfUnreferenced } else { Teardown::Force };
		let comp_id = comp_id.filter(|id| !id.is_empty()).map(str::to_owned);
		let state = Arc::clone(&self.state);
		let emptied = self.queue.call(move || state.handle_delete(form_id, comp_id.as_deref(), teardown))?;
		Ok(emptied)
	}

	/// Drops `host` from every form and queues teardown of forms left without hosts.
	///
	/// Returns true when no host references remain and every live renderer
	/// group is already queued for teardown. A group kept alive by a partial
	/// stop has no host reference but still counts.
	pub fn handle_host_died(&self, host: &HostToken) -> bool {
		let orphaned = self.state.hosts.remove_host(host);
		if !orphaned.is_empty() {
			tracing::info!(uid = %self.uid, forms = ?orphaned, "Form host died, cleaning renderers.");
		}
		for form_id in orphaned {
			self.state.pending_teardown.lock().insert(form_id);
			let state = Arc::clone(&self.state);
			if let Err(err) = self.queue.post(move || {
				state.handle_delete(form_id, None, Teardown::IfUnreferenced);
				state.pending_teardown.lock().remove(&form_id);
			}) {
				self.state.pending_teardown.lock().remove(&form_id);
				tracing::warn!(uid = %self.uid, form_id = %form_id, error = %err, "Could not queue renderer cleanup.");
			}
		}

		if !self.state.hosts.is_empty() {
			return false;
		}
		let pending = self.state.pending_teardown.lock();
		self.state.groups.form_ids().iter().all(|form_id| pending.contains(form_id))
	}

	/// Queues a reload of every listed form that has a renderer group.
	pub fn reload_form_record(&self, form_ids: Vec<FormId>) -> Result<()> {
		let state = Arc::clone(&self.state);
		self.queue.post(move || state.handle_reload(&form_ids)).map_err(Error::Reload)
	}

	/// Merges `delta` into the record and queues it for contexts and groups.
	pub fn update_configuration(&self, delta: &Configuration) {
		if delta.is_empty() {
			tracing::warn!(uid = %self.uid, "Configuration is empty, nothing to update.");
			return;
		}
		self.state.configuration.write().merge(delta);
		let state = Arc::clone(&self.state);
		let delta = delta.clone();
		if let Err(err) = self.queue.post(move || state.handle_update_configuration(&delta)) {
			tracing::warn!(uid = %self.uid, error = %err, "Could not queue configuration update.");
		}
	}

	/// True when no renderer group exists and no host holds a reference.
	///
	/// Host references cover renders that are queued but not yet applied.
	pub fn is_empty(&self) -> bool {
		self.state.groups.is_empty() && self.state.hosts.is_empty()
	}

	/// Blocks until every task posted before this call has run.
	pub fn flush(&self) -> Result<()> {
		self.queue.call(|| ())?;
		Ok(())
	}

	/// Probes the event loop's heartbeat.
	pub fn probe(&self) -> ThreadState {
		self.queue.probe(self.block_threshold)
	}

	pub fn queue_snapshot(&self) -> QueueSnapshot {
		self.queue.snapshot()
	}

	pub(crate) fn queue(&self) -> &TaskQueue {
		&self.queue
	}

	/// Forms with a live renderer group, ascending.
	pub fn form_ids(&self) -> Vec<FormId> {
		self.state.groups.form_ids()
	}

	pub fn has_renderer_group(&self, form_id: FormId) -> bool {
		self.state.groups.contains(form_id)
	}

	pub fn host_count(&self, form_id: FormId) -> usize {
		self.state.hosts.count(form_id)
	}

	pub fn has_host(&self, form_id: FormId, host: &HostToken) -> bool {
		self.state.hosts.contains(form_id, host)
	}

	pub fn context_count(&self) -> usize {
		self.state.contexts.len()
	}

	pub fn has_runtime(&self) -> bool {
		self.state.runtime.lock().is_some()
	}
}

impl Drop for FormRenderRecord {
	fn drop(&mut self) {
		let state = Arc::clone(&self.state);
		if let Err(err) = self.queue.call(move || state.handle_destroy()) {
			tracing::warn!(uid = %self.uid, error = %err, "Failed to destroy renderers on the event loop.");
		}
		self.queue.shutdown();
		tracing::debug!(uid = %self.uid, generation = self.generation(), "Render record destroyed.");
	}
}

impl RecordState {
	fn handle_update(&self, form: &FormJsInfo, request: &RenderRequest) {
		let Some(runtime) = self.ensure_runtime(form, request) else {
			return;
		};
		let configuration = self.configuration.read().clone();
		let context = match self.contexts.get_or_create(form, &configuration, self.backend.as_ref(), runtime.as_ref()) {
			Ok(context) => context,
			Err(err) => {
				tracing::error!(uid = %self.uid, form_id = %form.form_id, error = %err, "Failed to create module context.");
				return;
			}
		};

		match request.render_type {
			RenderType::Render => {
				if let Err(err) = self.groups.add_form(form, request, &context, &runtime, self.backend.as_ref()) {
					tracing::error!(uid = %self.uid, form_id = %form.form_id, error = %err, "Failed to create renderer group.");
				}
			}
			RenderType::Updating => {
				if !self.groups.update_form(form) {
					tracing::warn!(uid = %self.uid, form_id = %form.form_id, "Update skipped, renderer group not found.");
				}
			}
		}
	}

	fn ensure_runtime(&self, form: &FormJsInfo, request: &RenderRequest) -> Option<Arc<dyn FormRuntime>> {
		let mut runtime = self.runtime.lock();
		if let Some(runtime) = runtime.as_ref() {
			return Some(Arc::clone(runtime));
		}
		let options = RuntimeOptions::for_form(form, request.compile_mode, &self.event_runner);
		match self.backend.create_runtime(&options) {
			Ok(created) => {
				tracing::info!(uid = %self.uid, bundle = %options.bundle_name, "Runtime created.");
				*runtime = Some(Arc::clone(&created));
				Some(created)
			}
			Err(err) => {
				tracing::error!(uid = %self.uid, error = %err, "Failed to create runtime.");
				None
			}
		}
	}

	fn handle_delete(&self, form_id: FormId, comp_id: Option<&str>, teardown: Teardown) -> bool {
		if !self.groups.contains(form_id) {
			tracing::debug!(uid = %self.uid, form_id = %form_id, "No renderer group to delete.");
			if comp_id.is_none() && teardown == Teardown::Force {
				self.hosts.forget(form_id);
			}
			return false;
		}
		if let Some(comp_id) = comp_id {
			self.groups.delete_component(form_id, comp_id);
			return false;
		}
		if teardown == Teardown::IfUnreferenced {
			let remaining = self.hosts.count(form_id);
			if remaining > 0 {
				tracing::debug!(uid = %self.uid, form_id = %form_id, remaining, "Form still referenced by other hosts.");
				return false;
			}
		}
		self.groups.remove(form_id);
		self.hosts.forget(form_id);
		tracing::debug!(uid = %self.uid, form_id = %form_id, "Renderer group deleted.");
		true
	}

	fn handle_reload(&self, form_ids: &[FormId]) {
		for &form_id in form_ids {
			if !self.groups.reload(form_id) {
				tracing::debug!(uid = %self.uid, form_id = %form_id, "Reload skipped, renderer group not found.");
			}
		}
	}

	fn handle_update_configuration(&self, delta: &Configuration) {
		self.contexts.update_configuration(delta);
		self.groups.update_configuration(delta);
	}

	fn handle_destroy(&self) {
		self.pending_teardown.lock().clear();
		self.groups.clear();
		self.contexts.clear();
		self.hosts.clear();
		self.runtime.lock().take();
	}
}
