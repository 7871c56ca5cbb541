//! Process-wide dispatcher.
//!
//! [`FormRenderService`] routes boundary requests to the [`FormRenderRecord`]
//! of the caller's `(bundle, uid)`, creating records on demand and evicting
//! them once they hold nothing.
//!
//! Every operation is synchronous. Stop requests and record teardown block on
//! the record's event loop, so call the service from plain threads (or via
//! `spawn_blocking`), never from inside an async task.

use std::collections::HashMap;
use std::sync::Arc;

use formrender_worker::{QueueRegistry, QueueSnapshot, ThreadState};
use parking_lot::Mutex;

use crate::capability::{FormSupply, RenderBackend, SupplyResolver};
use crate::config::{Configuration, ServiceConfig};
use crate::error::{Error, Result};
use crate::form::{FormId, FormJsInfo, RecordKey};
use crate::host::{CallerToken, HostToken};
use crate::record::FormRenderRecord;
use crate::want::RenderRequest;
use crate::watchdog::Watchdog;

/// Records and the process-wide configuration share one lock.
#[derive(Default)]
struct ServiceState {
	records: HashMap<RecordKey, Arc<FormRenderRecord>>,
	configuration: Option<Configuration>,
}

/// Entry point of the form render engine.
pub struct FormRenderService {
	settings: ServiceConfig,
	backend: Arc<dyn RenderBackend>,
	resolver: Arc<dyn SupplyResolver>,
	state: Mutex<ServiceState>,
	queues: QueueRegistry,
}

impl std::fmt::Debug for FormRenderService {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FormRenderService")
			.field("settings", &self.settings)
			.field("records", &self.record_count())
			.finish_non_exhaustive()
	}
}

impl FormRenderService {
	pub fn new(settings: ServiceConfig, backend: Arc<dyn RenderBackend>, resolver: Arc<dyn SupplyResolver>) -> Self {
		let state = ServiceState {
			records: HashMap::new(),
			configuration: settings.configuration.clone(),
		};
		Self {
			settings,
			backend,
			resolver,
			state: Mutex::new(state),
			queues: QueueRegistry::new(),
		}
	}

	pub fn settings(&self) -> &ServiceConfig {
		&self.settings
	}

	/// Renders or updates `form` for the caller's `(bundle, uid)`.
	///
	/// The supply is told the task is done once the request has been handed
	/// to the record, whether or not the record accepted it.
	pub fn render_form(&self, form: &FormJsInfo, request: &RenderRequest, caller: &CallerToken) -> Result<()> {
		let supply = self.resolve_supply(caller)?;
		let uid = required_uid(request)?;
		tracing::info!(uid = %uid, form_id = %form.form_id, render_type = ?request.render_type, "Render form.");

		let result = self.dispatch_render(&uid, form, request)?;
		supply.on_render_task_done(form.form_id, &request.want);
		result
	}

	/// Stops rendering `form` (or one of its components) for one host.
	pub fn stop_rendering_form(&self, form: &FormJsInfo, request: &RenderRequest, caller: &CallerToken) -> Result<()> {
		let supply = self.resolve_supply(caller)?;
		let uid = required_uid(request)?;
		tracing::info!(uid = %uid, form_id = %form.form_id, comp_id = ?request.comp_id, "Stop rendering form.");

		let record = self.find_record(&uid)?;
		let group_emptied =
			record.delete_render_record(form.form_id, request.comp_id.as_deref(), request.host_token.as_ref())?;
		let evicted = self.evict_if_empty(&uid, &record);
		drop(record);
		drop(evicted);

		if group_emptied {
			supply.on_stop_rendering_task_done(form.form_id, &request.want);
		}
		Ok(())
	}

	/// Drops a dead host from every record, evicting records left unreferenced.
	pub fn clean_form_host(&self, host: &HostToken) -> Result<()> {
		let evicted: Vec<Arc<FormRenderRecord>> = {
			let mut state = self.state.lock();
			let unreferenced: Vec<RecordKey> = state
				.records
				.iter()
				.filter(|(_, record)| record.handle_host_died(host))
				.map(|(uid, _)| uid.clone())
				.collect();
			let evicted = unreferenced.iter().filter_map(|uid| state.records.remove(uid)).collect();
			log_if_idle(&state);
			evicted
		};
		tracing::info!(host = ?host, evicted = evicted.len(), "Form host cleaned.");
		drop(evicted);
		Ok(())
	}

	/// Re-runs the UI code of every listed form of the caller's record.
	pub fn reload_form(&self, form_ids: Vec<FormId>, request: &RenderRequest) -> Result<()> {
		if form_ids.is_empty() {
			tracing::error!("Reload requested without form ids.");
			return Err(Error::InvalidParam("form ids"));
		}
		let uid = required_uid(request)?;
		let record = self.find_record(&uid)?;
		tracing::info!(uid = %uid, forms = form_ids.len(), "Reload forms.");
		record.reload_form_record(form_ids)
	}

	/// Merges `configuration` into the process-wide snapshot and pushes the
	/// change to every record.
	pub fn on_configuration_updated(&self, configuration: Option<Configuration>) {
		let Some(update) = configuration else {
			tracing::warn!("Configuration is null, ignoring update.");
			return;
		};

		let mut state = self.state.lock();
		let delta = match state.configuration.as_mut() {
			None => {
				state.configuration = Some(update.clone());
				update
			}
			Some(current) => {
				let delta = current.diff(&update);
				current.merge(&update);
				delta
			}
		};
		if delta.is_empty() {
			tracing::debug!("Configuration unchanged, nothing to propagate.");
			return;
		}
		tracing::info!(records = state.records.len(), "Propagating configuration update.");
		for record in state.records.values() {
			record.update_configuration(&delta);
		}
	}

	/// Current process-wide configuration snapshot.
	pub fn configuration(&self) -> Option<Configuration> {
		self.state.lock().configuration.clone()
	}

	/// Probes every record's event loop and returns the deadlocked ones.
	pub fn check_threads(&self) -> Vec<RecordKey> {
		let records: Vec<Arc<FormRenderRecord>> = self.state.lock().records.values().cloned().collect();
		let mut stalled: Vec<RecordKey> = records
			.iter()
			.filter(|record| record.probe() == ThreadState::Deadlock)
			.map(|record| record.uid().clone())
			.collect();
		for uid in &stalled {
			tracing::error!(uid = %uid, "Render thread is deadlocked.");
		}
		stalled.sort();
		stalled
	}

	/// Starts the periodic liveness probe, or returns `None` if disabled.
	pub fn start_watchdog(self: &Arc<Self>) -> std::io::Result<Option<Watchdog>> {
		if !self.settings.watchdog.enabled {
			tracing::debug!("Watchdog disabled.");
			return Ok(None);
		}
		Watchdog::start(self).map(Some)
	}

	pub fn record(&self, uid: &RecordKey) -> Option<Arc<FormRenderRecord>> {
		self.state.lock().records.get(uid).cloned()
	}

	pub fn record_count(&self) -> usize {
		self.state.lock().records.len()
	}

	/// Uids of live records, sorted.
	pub fn uids(&self) -> Vec<RecordKey> {
		let mut uids: Vec<RecordKey> = self.state.lock().records.keys().cloned().collect();
		uids.sort();
		uids
	}

	/// True when no record is alive.
	pub fn is_idle(&self) -> bool {
		self.state.lock().records.is_empty()
	}

	/// Snapshots of every live record queue.
	pub fn queue_snapshots(&self) -> Vec<QueueSnapshot> {
		self.queues.snapshots()
	}

	fn resolve_supply(&self, caller: &CallerToken) -> Result<Arc<dyn FormSupply>> {
		self.resolver.resolve(caller).ok_or_else(|| {
			tracing::error!(caller = ?caller, "Caller token does not resolve to a form supply.");
			Error::BindProviderFailed
		})
	}

	fn find_record(&self, uid: &RecordKey) -> Result<Arc<FormRenderRecord>> {
		self.record(uid).ok_or_else(|| {
			tracing::error!(uid = %uid, "No render record for uid.");
			Error::RecordNotFound { uid: uid.clone() }
		})
	}

	/// Routes a render to its record, creating the record if needed.
	///
	/// The outer `Result` fails only when a new record could not be built; the
	/// inner one is the record's answer to the request. A new record's event
	/// loop is started without the map lock held; if another caller inserted a
	/// record for `uid` meanwhile, that one wins and the new one is discarded.
	fn dispatch_render(&self, uid: &RecordKey, form: &FormJsInfo, request: &RenderRequest) -> Result<Result<()>> {
		{
			let state = self.state.lock();
			if let Some(record) = state.records.get(uid) {
				return Ok(record.update_render_record(form, request));
			}
		}

		let record = FormRenderRecord::create(&form.bundle_name, uid.clone(), Arc::clone(&self.backend), &self.settings)?;

		let mut state = self.state.lock();
		if let Some(existing) = state.records.get(uid) {
			let result = existing.update_render_record(form, request);
			drop(state);
			tracing::debug!(uid = %uid, generation = record.generation(), "Lost record creation race, discarding.");
			drop(record);
			return Ok(result);
		}
		if let Some(configuration) = &state.configuration {
			record.set_configuration(configuration.clone());
		}
		let result = record.update_render_record(form, request);
		if result.is_err() {
			drop(state);
			drop(record);
			return Ok(result);
		}

		self.queues.register(record.queue());
		tracing::info!(uid = %uid, generation = record.generation(), records = state.records.len() + 1, "Render record added.");
		state.records.insert(uid.clone(), Arc::new(record));
		Ok(result)
	}

	/// Removes `record` from the map if it is still the live record for `uid`
	/// and holds nothing. The evicted record is returned so it is destroyed
	/// outside the lock.
	fn evict_if_empty(&self, uid: &RecordKey, record: &Arc<FormRenderRecord>) -> Option<Arc<FormRenderRecord>> {
		let mut state = self.state.lock();
		let current = state.records.get(uid)?;
		if !Arc::ptr_eq(current, record) || !record.is_empty() {
			return None;
		}
		let evicted = state.records.remove(uid);
		tracing::info!(uid = %uid, generation = record.generation(), "Render record is empty, removed.");
		log_if_idle(&state);
		evicted
	}
}

fn required_uid(request: &RenderRequest) -> Result<RecordKey> {
	match &request.uid {
		Some(uid) if !uid.is_empty() => Ok(uid.clone()),
		_ => {
			tracing::error!("Request carries no supply uid.");
			Err(Error::InvalidParam("uid"))
		}
	}
}

fn log_if_idle(state: &ServiceState) {
	if state.records.is_empty() {
		tracing::info!("Render service idle.");
	}
}
