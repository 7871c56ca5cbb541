//! Render-record lifecycle engine of the form render service.
//!
//! Forms are grouped per `(bundle, uid)` into a [`FormRenderRecord`]. Each
//! record owns one single-threaded event loop on which its embedded runtime,
//! module contexts and renderer groups are created, mutated and destroyed.
//! [`FormRenderService`] routes boundary requests to records, creates them on
//! demand and evicts them once nothing references them.
//!
//! The UI toolkit and the embedded runtime are reached only through the
//! [`RenderBackend`] family of traits; the form manager's callback object
//! through [`FormSupply`].

pub mod capability;
pub mod config;
pub mod context;
pub mod error;
pub mod form;
pub mod group;
pub mod host;
pub mod record;
pub mod runtime;
pub mod service;
pub mod want;
pub mod watchdog;

#[cfg(test)]
mod testing;

pub use capability::{FormRuntime, FormSupply, RemoteSupplyResolver, RenderBackend, RendererGroup, SupplyResolver};
pub use config::{ColorMode, Configuration, Direction, ServiceConfig, WatchdogConfig};
pub use context::{RenderContext, RenderContextCache};
pub use error::{BackendError, ConfigError, Error, Result};
pub use form::{CompileMode, FormId, FormJsInfo, ModuleContextKey, RecordKey, RenderType};
pub use formrender_worker::{QueueSnapshot, ThreadState};
pub use group::RendererGroupRegistry;
pub use host::{CallerToken, HostReferenceSet, HostToken, RemoteObject};
pub use record::FormRenderRecord;
pub use runtime::RuntimeOptions;
pub use service::FormRenderService;
pub use want::{RenderRequest, Want, WantParam};
pub use watchdog::Watchdog;
