//! Record-level lifecycle: host references, deletion policy and teardown.

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use common::{BUNDLE, FakeBackend, UID, form, host, quiet_settings, request};
use formrender::{Configuration, FormId, FormRenderRecord, RecordKey, RenderBackend};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn record(backend: &Arc<FakeBackend>) -> FormRenderRecord {
	let _ = tracing_subscriber::fmt::try_init();
	FormRenderRecord::create(BUNDLE, RecordKey::from(UID), Arc::clone(backend) as Arc<dyn RenderBackend>, &quiet_settings())
		.unwrap()
}

#[test]
fn new_record_is_empty() {
	let backend = Arc::new(FakeBackend::default());
	let record = record(&backend);

	assert!(record.is_empty());
	assert!(!record.has_runtime());
	assert_eq!(record.context_count(), 0);
	assert_eq!(record.uid().as_str(), UID);
	assert_eq!(record.queue_snapshot().name, "form-render:100com.example.weather");
}

#[rstest]
#[case::with_host(true, false)]
#[case::without_host(false, true)]
fn full_delete_respects_remaining_hosts(#[case] with_host: bool, #[case] torn_down: bool) {
	let backend = Arc::new(FakeBackend::default());
	let record = record(&backend);
	let first = host("first");
	let second = host("second");
	record.update_render_record(&form(1), &request(&first)).unwrap();
	record.update_render_record(&form(1), &request(&second)).unwrap();

	let token = with_host.then_some(&first);
	let emptied = record.delete_render_record(FormId(1), None, token).unwrap();

	assert_eq!(emptied, torn_down);
	assert_eq!(record.has_renderer_group(FormId(1)), !torn_down);
	assert_eq!(record.has_host(FormId(1), &second), !torn_down);
	assert!(!record.has_host(FormId(1), &first));
}

#[test]
fn component_delete_never_reports_empty() {
	let backend = Arc::new(FakeBackend::default());
	let record = record(&backend);
	let viewer = host("viewer");
	record.update_render_record(&form(1), &request(&viewer).with_comp_id("clock")).unwrap();

	let emptied = record.delete_render_record(FormId(1), Some("clock"), None).unwrap();

	assert!(!emptied);
	assert!(record.has_renderer_group(FormId(1)));
	assert!(backend.components(1).is_empty());
}

#[test]
fn deleting_an_unknown_form_reports_false() {
	let backend = Arc::new(FakeBackend::default());
	let record = record(&backend);

	assert!(!record.delete_render_record(FormId(42), None, None).unwrap());
	assert!(!record.delete_render_record(FormId(42), Some("clock"), Some(&host("viewer"))).unwrap());
	assert!(backend.journal().is_empty());
}

#[test]
fn forced_delete_drops_references_of_unrendered_form() {
	let backend = Arc::new(FakeBackend::default());
	backend.fail_runtime.store(true, Ordering::SeqCst);
	let record = record(&backend);
	record.update_render_record(&form(1), &request(&host("viewer"))).unwrap();

	assert!(!record.delete_render_record(FormId(1), None, None).unwrap());
	assert!(record.is_empty());
}

#[test]
fn host_death_reports_when_record_is_unreferenced() {
	let backend = Arc::new(FakeBackend::default());
	let record = record(&backend);
	let first = host("first");
	let second = host("second");
	record.update_render_record(&form(1), &request(&first)).unwrap();
	record.update_render_record(&form(2), &request(&second)).unwrap();

	assert!(!record.handle_host_died(&first));
	record.flush().unwrap();
	assert_eq!(record.form_ids(), vec![FormId(2)]);

	assert!(record.handle_host_died(&second));
	record.flush().unwrap();
	assert!(record.is_empty());
	assert_eq!(backend.journal(), vec!["1:add()", "2:add()", "1:delete_form", "2:delete_form"]);
}

#[test]
fn reload_skips_forms_without_group() {
	let backend = Arc::new(FakeBackend::default());
	let record = record(&backend);
	record.update_render_record(&form(2), &request(&host("viewer"))).unwrap();

	record.reload_form_record(vec![FormId(1), FormId(2), FormId(3)]).unwrap();
	record.flush().unwrap();

	assert_eq!(backend.journal(), vec!["2:add()", "2:reload"]);
}

#[test]
fn empty_configuration_update_is_ignored() {
	let backend = Arc::new(FakeBackend::default());
	let record = record(&backend);
	record.update_render_record(&form(1), &request(&host("viewer"))).unwrap();

	record.update_configuration(&Configuration::default());
	record.flush().unwrap();

	assert_eq!(backend.journal(), vec!["1:add()"]);
	assert!(record.configuration().is_empty());
}

#[test]
fn drop_destroys_everything_on_the_event_loop() {
	let backend = Arc::new(FakeBackend::default());
	let record = record(&backend);
	let viewer = host("viewer");
	record.update_render_record(&form(1), &request(&viewer)).unwrap();
	record.update_render_record(&form(2), &request(&viewer)).unwrap();

	drop(record);

	assert!(backend.live_forms().is_empty());
	assert_eq!(backend.runtimes_alive.load(Ordering::SeqCst), 0);
	let threads: Vec<String> = backend.threads.lock().iter().cloned().collect();
	assert_eq!(threads, vec!["form-render:100com.example.weather".to_string()]);
}

#[test]
fn host_death_keeps_record_with_unreferenced_group() {
	let backend = Arc::new(FakeBackend::default());
	let record = record(&backend);
	let viewer = host("viewer");
	record.update_render_record(&form(7), &request(&viewer).with_comp_id("c1")).unwrap();
	record.update_render_record(&form(7), &request(&viewer).with_comp_id("c2")).unwrap();
	record.delete_render_record(FormId(7), Some("c1"), Some(&viewer)).unwrap();

	assert!(!record.handle_host_died(&host("stranger")));
	record.flush().unwrap();
	assert_eq!(record.form_ids(), vec![FormId(7)]);
	assert_eq!(backend.components(7), vec!["c2"]);
}

#[test]
fn consecutive_host_deaths_count_queued_teardowns() {
	let backend = Arc::new(FakeBackend::default());
	let record = record(&backend);
	let first = host("first");
	let second = host("second");
	record.update_render_record(&form(1), &request(&first)).unwrap();
	record.update_render_record(&form(2), &request(&second)).unwrap();
	record.flush().unwrap();
	let gate = backend.close_gate();
	record.update_render_record(&form(3), &request(&first)).unwrap();

	assert!(!record.handle_host_died(&first));
	assert!(record.handle_host_died(&second));

	gate.open();
	record.flush().unwrap();
	assert!(record.is_empty());
	assert!(backend.live_forms().is_empty());
}
