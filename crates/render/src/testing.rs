//! In-crate test doubles for the backend traits.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::capability::{FormRuntime, RenderBackend, RendererGroup};
use crate::config::Configuration;
use crate::context::RenderContext;
use crate::error::BackendError;
use crate::form::FormJsInfo;
use crate::runtime::RuntimeOptions;
use crate::want::RenderRequest;

pub(crate) struct StubRuntime(pub RuntimeOptions);

impl FormRuntime for StubRuntime {
	fn options(&self) -> &RuntimeOptions {
		&self.0
	}
}

pub(crate) fn runtime() -> Arc<dyn FormRuntime> {
	Arc::new(StubRuntime(RuntimeOptions::for_form(
		&FormJsInfo::new(1, "com.example.weather", "entry"),
		Default::default(),
		"test",
	)))
}

/// Records every call made on the groups it creates, as `"<form>:<op>"`.
#[derive(Default)]
pub(crate) struct StubBackend {
	pub calls: Arc<Mutex<Vec<String>>>,
	pub contexts: AtomicUsize,
	pub fail_context: AtomicBool,
	pub fail_group: AtomicBool,
}

impl StubBackend {
	pub fn calls(&self) -> Vec<String> {
		self.calls.lock().clone()
	}
}

impl RenderBackend for StubBackend {
	fn create_runtime(&self, options: &RuntimeOptions) -> Result<Arc<dyn FormRuntime>, BackendError> {
		Ok(Arc::new(StubRuntime(options.clone())))
	}

	fn init_context(&self, context: &RenderContext, _runtime: &dyn FormRuntime) -> Result<(), BackendError> {
		if self.fail_context.load(Ordering::SeqCst) {
			return Err(BackendError::Context {
				module: context.module_name().to_string(),
				reason: "resources missing".to_string(),
			});
		}
		self.contexts.fetch_add(1, Ordering::SeqCst);
		Ok(())
	}

	fn create_renderer_group(
		&self,
		form: &FormJsInfo,
		_context: &Arc<RenderContext>,
		_runtime: &Arc<dyn FormRuntime>,
	) -> Result<Box<dyn RendererGroup>, BackendError> {
		if self.fail_group.load(Ordering::SeqCst) {
			return Err(BackendError::RendererGroup {
				form_id: form.form_id.0,
				reason: "no surface".to_string(),
			});
		}
		Ok(Box::new(StubGroup {
			form_id: form.form_id.0,
			calls: Arc::clone(&self.calls),
		}))
	}
}

struct StubGroup {
	form_id: i64,
	calls: Arc<Mutex<Vec<String>>>,
}

impl StubGroup {
	fn log(&self, op: &str) {
		self.calls.lock().push(format!("{}:{op}", self.form_id));
	}
}

impl RendererGroup for StubGroup {
	fn add_form(&mut self, _form: &FormJsInfo, request: &RenderRequest) {
		match &request.comp_id {
			Some(comp_id) => self.log(&format!("add({comp_id})")),
			None => self.log("add"),
		}
	}

	fn update_form(&mut self, _form: &FormJsInfo) {
		self.log("update");
	}

	fn delete_component(&mut self, comp_id: &str) {
		self.log(&format!("delete({comp_id})"));
	}

	fn delete_form(&mut self) {
		self.log("delete_form");
	}

	fn reload_form(&mut self) {
		self.log("reload");
	}

	fn update_configuration(&mut self, _config: &Configuration) {
		self.log("configuration");
	}
}
