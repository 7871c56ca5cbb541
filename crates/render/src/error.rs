//! Error types and boundary error codes.

use std::path::PathBuf;

use formrender_worker::QueueError;
use thiserror::Error;

use crate::form::RecordKey;

/// Success code reported across the service boundary.
pub const ERR_OK: i32 = 0;
/// A render or stop request could not be routed or queued.
pub const RENDER_FORM_FAILED: i32 = -1;
/// A reload request could not be queued.
pub const RELOAD_FORM_FAILED: i32 = -1;
/// A required request parameter was missing or empty.
pub const ERR_APPEXECFWK_FORM_INVALID_PARAM: i32 = 2_293_767;
/// The caller token does not resolve to a form supply capability.
pub const ERR_APPEXECFWK_FORM_BIND_PROVIDER_FAILED: i32 = 2_293_778;

/// Errors surfaced synchronously by the render service.
#[derive(Debug, Error)]
pub enum Error {
	/// The caller token could not be resolved to a supply capability.
	#[error("caller token does not resolve to a form supply")]
	BindProviderFailed,

	/// A required parameter is missing or empty.
	#[error("invalid parameter: {0}")]
	InvalidParam(&'static str),

	/// No render record exists for the uid.
	#[error("no render record for uid {uid}")]
	RecordNotFound {
		/// Dispatch key that was looked up.
		uid: RecordKey,
	},

	/// A render request arrived without a host token.
	#[error("render request for form {form_id} has no host token")]
	MissingHostToken {
		/// Form the request targeted.
		form_id: i64,
	},

	/// The record's task queue is unavailable.
	#[error("render queue unavailable: {0}")]
	Queue(#[from] QueueError),

	/// The record's task queue rejected a reload.
	#[error("reload queue unavailable: {0}")]
	Reload(#[source] QueueError),

	/// Service configuration could not be loaded.
	#[error(transparent)]
	Config(#[from] ConfigError),
}

impl Error {
	/// Maps the error onto the numeric code reported across the boundary.
	pub fn code(&self) -> i32 {
		match self {
			Self::BindProviderFailed => ERR_APPEXECFWK_FORM_BIND_PROVIDER_FAILED,
			Self::InvalidParam(_) | Self::Config(_) => ERR_APPEXECFWK_FORM_INVALID_PARAM,
			Self::RecordNotFound { .. } | Self::MissingHostToken { .. } | Self::Queue(_) => RENDER_FORM_FAILED,
			Self::Reload(_) => RELOAD_FORM_FAILED,
		}
	}
}

/// Errors that can occur when loading service configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error parsing TOML syntax or shape.
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),

	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// A value is outside its accepted range.
	#[error("invalid value for {field}: {reason}")]
	InvalidValue {
		/// Dotted field name.
		field: &'static str,
		/// Why the value was rejected.
		reason: String,
	},
}

/// Errors reported by a [`RenderBackend`](crate::RenderBackend) while building resources.
///
/// These never reach the caller; the record logs them on its task queue and
/// abandons the operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
	/// The embedded runtime could not be created.
	#[error("runtime creation failed: {0}")]
	Runtime(String),

	/// A module context could not be initialised.
	#[error("context creation failed for {module}: {reason}")]
	Context {
		/// Module context key.
		module: String,
		/// Backend-provided reason.
		reason: String,
	},

	/// A renderer group could not be created.
	#[error("renderer group creation failed for form {form_id}: {reason}")]
	RendererGroup {
		/// Form the group was for.
		form_id: i64,
		/// Backend-provided reason.
		reason: String,
	},
}

/// Result type for render service operations.
pub type Result<T> = std::result::Result<T, Error>;
