//! Options for creating a record's embedded runtime.

use crate::form::{CompileMode, FormJsInfo};

/// Sandbox code path the runtime resolves bundle code against.
pub const LOCAL_CODE_PATH: &str = "/data/storage/el1/bundle";

/// Parameters for [`RenderBackend::create_runtime`](crate::RenderBackend::create_runtime).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeOptions {
	pub bundle_name: String,
	pub code_path: String,
	pub hap_path: String,
	/// Name of the event loop the runtime is bound to.
	pub event_runner: String,
	pub load_ace: bool,
	pub is_bundle: bool,
	pub is_unique: bool,
}

impl RuntimeOptions {
	/// Options for the runtime that will host `form` on `event_runner`.
	pub fn for_form(form: &FormJsInfo, compile_mode: CompileMode, event_runner: &str) -> Self {
		Self {
			bundle_name: form.bundle_name.clone(),
			code_path: LOCAL_CODE_PATH.to_string(),
			hap_path: form.js_form_code_path.clone(),
			event_runner: event_runner.to_string(),
			load_ace: true,
			is_bundle: compile_mode.is_bundle(),
			is_unique: true,
		}
	}
}
