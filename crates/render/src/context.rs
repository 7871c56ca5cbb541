//! Per-module rendering contexts, shared by every form of the same module.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::capability::{FormRuntime, RenderBackend};
use crate::config::Configuration;
use crate::error::BackendError;
use crate::form::{FormJsInfo, ModuleContextKey};

/// Module metadata plus the UI configuration forms of that module render with.
#[derive(Debug)]
pub struct RenderContext {
	key: ModuleContextKey,
	bundle_name: String,
	module_name: String,
	hap_path: String,
	configuration: RwLock<Configuration>,
}

impl RenderContext {
	fn new(form: &FormJsInfo, configuration: Configuration) -> Self {
		Self {
			key: form.module_key(),
			bundle_name: form.bundle_name.clone(),
			module_name: form.module_name.clone(),
			hap_path: form.js_form_code_path.clone(),
			configuration: RwLock::new(configuration),
		}
	}

	pub fn key(&self) -> &ModuleContextKey {
		&self.key
	}

	pub fn bundle_name(&self) -> &str {
		&self.bundle_name
	}

	pub fn module_name(&self) -> &str {
		&self.module_name
	}

	pub fn hap_path(&self) -> &str {
		&self.hap_path
	}

	/// Snapshot of the current configuration.
	pub fn configuration(&self) -> Configuration {
		self.configuration.read().clone()
	}

	fn apply(&self, delta: &Configuration) {
		self.configuration.write().merge(delta);
	}
}

/// Lazily built contexts keyed by `bundleName:moduleName`.
///
/// Mutated only from the owning record's event loop.
#[derive(Debug, Default)]
pub struct RenderContextCache {
	contexts: Mutex<HashMap<ModuleContextKey, Arc<RenderContext>>>,
}

impl RenderContextCache {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the context for `form`'s module, building it on first use.
	pub fn get_or_create(
		&self,
		form: &FormJsInfo,
		configuration: &Configuration,
		backend: &dyn RenderBackend,
		runtime: &dyn FormRuntime,
	) -> Result<Arc<RenderContext>, BackendError> {
		let key = form.module_key();
		if let Some(context) = self.get(&key) {
			return Ok(context);
		}

		// Built unlocked; only the owning event loop inserts.
		let context = Arc::new(RenderContext::new(form, configuration.clone()));
		backend.init_context(&context, runtime)?;
		tracing::debug!(context = %key, "Module context created.");
		self.contexts.lock().insert(key, Arc::clone(&context));
		Ok(context)
	}

	pub fn get(&self, key: &ModuleContextKey) -> Option<Arc<RenderContext>> {
		self.contexts.lock().get(key).cloned()
	}

	pub fn update_configuration(&self, delta: &Configuration) {
		for context in self.contexts.lock().values() {
			context.apply(delta);
		}
	}

	pub fn len(&self) -> usize {
		self.contexts.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.contexts.lock().is_empty()
	}

	pub fn clear(&self) {
		self.contexts.lock().clear();
	}
}
