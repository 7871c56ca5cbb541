//! Capabilities the render engine consumes.
//!
//! The UI toolkit, the embedded runtime and the form manager's callback
//! object all live outside this crate; the engine only talks to them through
//! these traits.

use std::sync::Arc;

use crate::config::Configuration;
use crate::context::RenderContext;
use crate::error::BackendError;
use crate::form::{FormId, FormJsInfo};
use crate::host::CallerToken;
use crate::runtime::RuntimeOptions;
use crate::want::{RenderRequest, Want};

/// Callback object of the form manager, notified when tasks complete.
pub trait FormSupply: Send + Sync {
	/// A render request was accepted and queued.
	fn on_render_task_done(&self, form_id: FormId, want: &Want);

	/// A form's renderer group was torn down completely.
	fn on_stop_rendering_task_done(&self, form_id: FormId, want: &Want);
}

/// Resolves a caller token to the supply capability behind it.
pub trait SupplyResolver: Send + Sync {
	fn resolve(&self, caller: &CallerToken) -> Option<Arc<dyn FormSupply>>;
}

/// Resolver for caller tokens whose payload is an `Arc<dyn FormSupply>`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RemoteSupplyResolver;

impl SupplyResolver for RemoteSupplyResolver {
	fn resolve(&self, caller: &CallerToken) -> Option<Arc<dyn FormSupply>> {
		caller.downcast_ref::<Arc<dyn FormSupply>>().cloned()
	}
}

/// Embedded runtime instance owned by one render record.
pub trait FormRuntime: Send + Sync {
	fn options(&self) -> &RuntimeOptions;
}

/// Live UI tree of one form, holding one or more components.
///
/// Only ever driven from the owning record's event loop.
pub trait RendererGroup: Send {
	/// Adds the component described by `request` (or the whole form).
	fn add_form(&mut self, form: &FormJsInfo, request: &RenderRequest);

	/// Pushes new data into the rendered form.
	fn update_form(&mut self, form: &FormJsInfo);

	/// Removes one component; the group stays alive.
	fn delete_component(&mut self, comp_id: &str);

	/// Tears down every component ahead of the group being dropped.
	fn delete_form(&mut self);

	/// Re-runs the form's UI code.
	fn reload_form(&mut self);

	fn update_configuration(&mut self, config: &Configuration);
}

/// Factory for runtimes, module contexts and renderer groups.
pub trait RenderBackend: Send + Sync {
	fn create_runtime(&self, options: &RuntimeOptions) -> Result<Arc<dyn FormRuntime>, BackendError>;

	/// Prepares a freshly built module context (resources, module metadata).
	fn init_context(&self, context: &RenderContext, runtime: &dyn FormRuntime) -> Result<(), BackendError>;

	fn create_renderer_group(
		&self,
		form: &FormJsInfo,
		context: &Arc<RenderContext>,
		runtime: &Arc<dyn FormRuntime>,
	) -> Result<Box<dyn RendererGroup>, BackendError>;
}
