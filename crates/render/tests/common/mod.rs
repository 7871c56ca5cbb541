//! Test doubles and fixtures shared by the render integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use formrender::{
	BackendError, CallerToken, Configuration, FormId, FormJsInfo, FormRenderService, FormRuntime, FormSupply, HostToken,
	RemoteObject, RemoteSupplyResolver, RenderBackend, RenderContext, RenderRequest, RendererGroup, RuntimeOptions,
	ServiceConfig, Want,
};
use parking_lot::{Condvar, Mutex};

pub const UID: &str = "100com.example.weather";
pub const BUNDLE: &str = "com.example.weather";

/// Blocks renderer-group creation until opened.
#[derive(Default)]
pub struct Gate {
	open: Mutex<bool>,
	opened: Condvar,
}

impl Gate {
	pub fn wait(&self) {
		let mut open = self.open.lock();
		while !*open {
			self.opened.wait(&mut open);
		}
	}

	pub fn open(&self) {
		*self.open.lock() = true;
		self.opened.notify_all();
	}
}

/// Components of every live renderer group, keyed by form id.
type LiveGroups = Arc<Mutex<BTreeMap<i64, BTreeSet<String>>>>;

#[derive(Default)]
pub struct FakeBackend {
	pub journal: Arc<Mutex<Vec<String>>>,
	pub live: LiveGroups,
	/// Names of the threads renderer groups were driven from.
	pub threads: Arc<Mutex<BTreeSet<String>>>,
	pub runtimes_created: AtomicUsize,
	pub runtimes_alive: Arc<AtomicUsize>,
	pub contexts_created: AtomicUsize,
	pub fail_runtime: AtomicBool,
	pub gate: Mutex<Option<Arc<Gate>>>,
	pub last_options: Mutex<Option<RuntimeOptions>>,
}

impl FakeBackend {
	pub fn journal(&self) -> Vec<String> {
		self.journal.lock().clone()
	}

	pub fn live_forms(&self) -> Vec<i64> {
		self.live.lock().keys().copied().collect()
	}

	pub fn components(&self, form_id: i64) -> Vec<String> {
		self.live.lock().get(&form_id).map(|c| c.iter().cloned().collect()).unwrap_or_default()
	}

	/// Makes the next group creations block until the returned gate opens.
	pub fn close_gate(&self) -> Arc<Gate> {
		let gate = Arc::new(Gate::default());
		*self.gate.lock() = Some(Arc::clone(&gate));
		gate
	}
}

struct FakeRuntime {
	options: RuntimeOptions,
	alive: Arc<AtomicUsize>,
}

impl FormRuntime for FakeRuntime {
	fn options(&self) -> &RuntimeOptions {
		&self.options
	}
}

impl Drop for FakeRuntime {
	fn drop(&mut self) {
		self.alive.fetch_sub(1, Ordering::SeqCst);
	}
}

impl RenderBackend for FakeBackend {
	fn create_runtime(&self, options: &RuntimeOptions) -> Result<Arc<dyn FormRuntime>, BackendError> {
		if self.fail_runtime.load(Ordering::SeqCst) {
			return Err(BackendError::Runtime("engine unavailable".to_string()));
		}
		self.runtimes_created.fetch_add(1, Ordering::SeqCst);
		self.runtimes_alive.fetch_add(1, Ordering::SeqCst);
		*self.last_options.lock() = Some(options.clone());
		Ok(Arc::new(FakeRuntime {
			options: options.clone(),
			alive: Arc::clone(&self.runtimes_alive),
		}))
	}

	fn init_context(&self, _context: &RenderContext, _runtime: &dyn FormRuntime) -> Result<(), BackendError> {
		self.contexts_created.fetch_add(1, Ordering::SeqCst);
		Ok(())
	}

	fn create_renderer_group(
		&self,
		form: &FormJsInfo,
		_context: &Arc<RenderContext>,
		_runtime: &Arc<dyn FormRuntime>,
	) -> Result<Box<dyn RendererGroup>, BackendError> {
		let gate = self.gate.lock().clone();
		if let Some(gate) = gate {
			gate.wait();
		}
		self.live.lock().insert(form.form_id.0, BTreeSet::new());
		Ok(Box::new(FakeGroup {
			form_id: form.form_id.0,
			journal: Arc::clone(&self.journal),
			live: Arc::clone(&self.live),
			threads: Arc::clone(&self.threads),
		}))
	}
}

struct FakeGroup {
	form_id: i64,
	journal: Arc<Mutex<Vec<String>>>,
	live: LiveGroups,
	threads: Arc<Mutex<BTreeSet<String>>>,
}

impl FakeGroup {
	fn log(&self, op: String) {
		let thread = std::thread::current().name().unwrap_or("<unnamed>").to_string();
		self.threads.lock().insert(thread);
		self.journal.lock().push(format!("{}:{op}", self.form_id));
	}

	fn components(&self, f: impl FnOnce(&mut BTreeSet<String>)) {
		if let Some(components) = self.live.lock().get_mut(&self.form_id) {
			f(components);
		}
	}
}

impl RendererGroup for FakeGroup {
	fn add_form(&mut self, _form: &FormJsInfo, request: &RenderRequest) {
		let comp_id = request.comp_id.clone().unwrap_or_default();
		self.log(format!("add({comp_id})"));
		self.components(|c| {
			c.insert(comp_id);
		});
	}

	fn update_form(&mut self, _form: &FormJsInfo) {
		self.log("update".to_string());
	}

	fn delete_component(&mut self, comp_id: &str) {
		self.log(format!("delete({comp_id})"));
		self.components(|c| {
			c.remove(comp_id);
		});
	}

	fn delete_form(&mut self) {
		self.log("delete_form".to_string());
		self.components(BTreeSet::clear);
	}

	fn reload_form(&mut self) {
		self.log("reload".to_string());
	}

	fn update_configuration(&mut self, _config: &Configuration) {
		self.log("configuration".to_string());
	}
}

impl Drop for FakeGroup {
	fn drop(&mut self) {
		self.live.lock().remove(&self.form_id);
	}
}

/// Supply capability that records every notification.
#[derive(Default)]
pub struct RecordingSupply {
	pub rendered: Mutex<Vec<FormId>>,
	pub stopped: Mutex<Vec<FormId>>,
	pub wants: Mutex<Vec<Want>>,
}

impl RecordingSupply {
	pub fn rendered(&self) -> Vec<FormId> {
		self.rendered.lock().clone()
	}

	pub fn stopped(&self) -> Vec<FormId> {
		self.stopped.lock().clone()
	}
}

impl FormSupply for RecordingSupply {
	fn on_render_task_done(&self, form_id: FormId, want: &Want) {
		self.rendered.lock().push(form_id);
		self.wants.lock().push(want.clone());
	}

	fn on_stop_rendering_task_done(&self, form_id: FormId, want: &Want) {
		self.stopped.lock().push(form_id);
		self.wants.lock().push(want.clone());
	}
}

pub fn quiet_settings() -> ServiceConfig {
	let mut settings = ServiceConfig::default();
	settings.watchdog.enabled = false;
	settings
}

pub struct Harness {
	pub service: Arc<FormRenderService>,
	pub backend: Arc<FakeBackend>,
	pub supply: Arc<RecordingSupply>,
	pub caller: CallerToken,
}

impl Harness {
	pub fn new() -> Self {
		Self::with_settings(quiet_settings())
	}

	pub fn with_settings(settings: ServiceConfig) -> Self {
		let _ = tracing_subscriber::fmt::try_init();
		let backend = Arc::new(FakeBackend::default());
		let supply = Arc::new(RecordingSupply::default());
		let caller = RemoteObject::new(Arc::clone(&supply) as Arc<dyn FormSupply>);
		let service = Arc::new(FormRenderService::new(
			settings,
			Arc::clone(&backend) as Arc<dyn RenderBackend>,
			Arc::new(RemoteSupplyResolver),
		));
		Self {
			service,
			backend,
			supply,
			caller,
		}
	}

	pub fn render(&self, form_id: i64, host: &HostToken) -> formrender::Result<()> {
		self.service.render_form(&form(form_id), &request(host), &self.caller)
	}

	pub fn render_component(&self, form_id: i64, comp_id: &str, host: &HostToken) -> formrender::Result<()> {
		self.service.render_form(&form(form_id), &request(host).with_comp_id(comp_id), &self.caller)
	}

	pub fn stop(&self, form_id: i64, host: &HostToken) -> formrender::Result<()> {
		self.service.stop_rendering_form(&form(form_id), &request(host), &self.caller)
	}

	/// Waits for every task queued on the default record so far.
	pub fn flush(&self) {
		if let Some(record) = self.service.record(&UID.into()) {
			record.flush().unwrap();
		}
	}
}

pub fn form(form_id: i64) -> FormJsInfo {
	FormJsInfo {
		form_name: "widget".to_string(),
		js_form_code_path: "/data/app/el1/bundle/weather.hap".to_string(),
		..FormJsInfo::new(form_id, BUNDLE, "entry")
	}
}

pub fn host(name: &'static str) -> HostToken {
	RemoteObject::new(name)
}

pub fn request(host: &HostToken) -> RenderRequest {
	RenderRequest::new(UID).with_host(host.clone())
}
