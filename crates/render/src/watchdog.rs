//! Periodic liveness probe over every record's event loop.

use std::sync::{Arc, Weak};
use std::thread::JoinHandle;

use formrender_worker::{TaskClass, spawn_named_thread};
use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::service::FormRenderService;

#[derive(Debug, Default)]
struct StopSignal {
	stopped: Mutex<bool>,
	wake: Condvar,
}

/// Housekeeping thread calling [`FormRenderService::check_threads`] on an interval.
///
/// Holds the service weakly; the thread exits once the service is dropped.
#[derive(Debug)]
pub struct Watchdog {
	signal: Arc<StopSignal>,
	join: Option<JoinHandle<()>>,
}

impl Watchdog {
	pub fn start(service: &Arc<FormRenderService>) -> std::io::Result<Self> {
		let settings = service.settings();
		let interval = settings.watchdog.interval();
		let name = format!("{}:watchdog", settings.queue_name_prefix);
		let signal = Arc::new(StopSignal::default());
		let service = Arc::downgrade(service);

		let thread_signal = Arc::clone(&signal);
		let join = spawn_named_thread(TaskClass::Housekeeping, name, move || {
			run_probe_loop(&thread_signal, &service, interval);
		})?;
		tracing::info!(interval_ms = settings.watchdog.interval_ms, "Watchdog started.");
		Ok(Self {
			signal,
			join: Some(join),
		})
	}

	/// Stops the probe thread and waits for it to exit.
	pub fn stop(&mut self) {
		*self.signal.stopped.lock() = true;
		self.signal.wake.notify_all();
		if let Some(join) = self.join.take() {
			if join.join().is_err() {
				tracing::error!("Watchdog thread panicked.");
			}
			tracing::info!("Watchdog stopped.");
		}
	}
}

impl Drop for Watchdog {
	fn drop(&mut self) {
		self.stop();
	}
}

fn run_probe_loop(signal: &StopSignal, service: &Weak<FormRenderService>, interval: std::time::Duration) {
	let mut stopped = signal.stopped.lock();
	while !*stopped {
		if !signal.wake.wait_for(&mut stopped, interval).timed_out() {
			continue;
		}
		if *stopped {
			break;
		}
		let Some(service) = service.upgrade() else {
			tracing::debug!("Render service gone, watchdog exiting.");
			break;
		};
		MutexGuard::unlocked(&mut stopped, || {
			let stalled = service.check_threads();
			if !stalled.is_empty() {
				tracing::error!(stalled = ?stalled, "Render threads stalled.");
			}
			drop(service);
		});
	}
}
