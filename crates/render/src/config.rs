//! UI configuration and service settings.
//!
//! [`Configuration`] is the UI environment (color mode, language, ...) pushed
//! to every render record. [`ServiceConfig`] holds the service's own settings
//! and is read from TOML:
//!
//! ```toml
//! queue_name_prefix = "form-render"
//!
//! [watchdog]
//! enabled = true
//! interval_ms = 5000
//! block_threshold = 3
//!
//! [configuration]
//! color_mode = "dark"
//! language = "en"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// System color mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
	Light,
	Dark,
}

/// Screen orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
	Vertical,
	Horizontal,
}

/// UI configuration propagated to module contexts and renderer groups.
///
/// Every item is optional: an update only carries the items that changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Configuration {
	pub color_mode: Option<ColorMode>,
	pub language: Option<String>,
	pub locale: Option<String>,
	pub font_size_scale: Option<f32>,
	pub direction: Option<Direction>,
	pub density_dpi: Option<u32>,
}

impl Configuration {
	/// Returns true when no item is set.
	pub fn is_empty(&self) -> bool {
		*self == Self::default()
	}

	/// Items set in `update` whose value differs from `self`.
	pub fn diff(&self, update: &Self) -> Self {
		Self {
			color_mode: changed(&self.color_mode, &update.color_mode),
			language: changed(&self.language, &update.language),
			locale: changed(&self.locale, &update.locale),
			font_size_scale: changed(&self.font_size_scale, &update.font_size_scale),
			direction: changed(&self.direction, &update.direction),
			density_dpi: changed(&self.density_dpi, &update.density_dpi),
		}
	}

	/// Overwrites the items that are set in `update`.
	pub fn merge(&mut self, update: &Self) {
		overlay(&mut self.color_mode, &update.color_mode);
		overlay(&mut self.language, &update.language);
		overlay(&mut self.locale, &update.locale);
		overlay(&mut self.font_size_scale, &update.font_size_scale);
		overlay(&mut self.direction, &update.direction);
		overlay(&mut self.density_dpi, &update.density_dpi);
	}
}

fn changed<T: Clone + PartialEq>(current: &Option<T>, update: &Option<T>) -> Option<T> {
	match update {
		Some(value) if current.as_ref() != Some(value) => Some(value.clone()),
		_ => None,
	}
}

fn overlay<T: Clone>(slot: &mut Option<T>, update: &Option<T>) {
	if let Some(value) = update {
		*slot = Some(value.clone());
	}
}

/// Liveness probing of record event loops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchdogConfig {
	pub enabled: bool,
	/// Time between probes; a heartbeat not answered within one interval is a miss.
	pub interval_ms: u64,
	/// Consecutive misses after which a loop counts as deadlocked.
	pub block_threshold: u32,
}

impl WatchdogConfig {
	pub fn interval(&self) -> Duration {
		Duration::from_millis(self.interval_ms)
	}
}

impl Default for WatchdogConfig {
	fn default() -> Self {
		Self {
			enabled: true,
			interval_ms: 5000,
			block_threshold: 3,
		}
	}
}

/// Settings of the render service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
	/// Per-record event loop threads are named `{prefix}:{uid}`.
	pub queue_name_prefix: String,
	pub watchdog: WatchdogConfig,
	/// Initial process-wide UI configuration.
	pub configuration: Option<Configuration>,
}

impl Default for ServiceConfig {
	fn default() -> Self {
		Self {
			queue_name_prefix: "form-render".to_string(),
			watchdog: WatchdogConfig::default(),
			configuration: None,
		}
	}
}

impl ServiceConfig {
	/// Parses and validates settings from TOML text.
	pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(text)?;
		config.validate()?;
		Ok(config)
	}

	/// Reads settings from a TOML file.
	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		let text = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::from_toml_str(&text)
	}

	/// Thread name of the event loop for `uid`.
	pub fn queue_name(&self, uid: &str) -> String {
		format!("{}:{uid}", self.queue_name_prefix)
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.queue_name_prefix.is_empty() || self.queue_name_prefix.contains('\0') {
			return Err(ConfigError::InvalidValue {
				field: "queue_name_prefix",
				reason: "must be non-empty and free of NUL bytes".to_string(),
			});
		}
		if self.watchdog.interval_ms == 0 {
			return Err(ConfigError::InvalidValue {
				field: "watchdog.interval_ms",
				reason: "must be greater than zero".to_string(),
			});
		}
		if self.watchdog.block_threshold == 0 {
			return Err(ConfigError::InvalidValue {
				field: "watchdog.block_threshold",
				reason: "must be greater than zero".to_string(),
			});
		}
		Ok(())
	}
}
