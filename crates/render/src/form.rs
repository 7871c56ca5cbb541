//! Identity and descriptor types for forms and render records.

use std::fmt;

/// Globally unique id of one form instance, issued by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FormId(pub i64);

impl fmt::Display for FormId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.0.fmt(f)
	}
}

impl From<i64> for FormId {
	fn from(id: i64) -> Self {
		Self(id)
	}
}

/// Dispatch key of one render record: the user id followed by the bundle name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey(String);

impl RecordKey {
	/// Builds the key the way the form manager composes it.
	pub fn from_parts(user_id: i32, bundle_name: &str) -> Self {
		Self(format!("{user_id}{bundle_name}"))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl fmt::Display for RecordKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for RecordKey {
	fn from(uid: &str) -> Self {
		Self(uid.to_owned())
	}
}

impl From<String> for RecordKey {
	fn from(uid: String) -> Self {
		Self(uid)
	}
}

/// Key of a module context: `bundleName:moduleName`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleContextKey(String);

impl ModuleContextKey {
	pub fn new(bundle_name: &str, module_name: &str) -> Self {
		Self(format!("{bundle_name}:{module_name}"))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for ModuleContextKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Whether a render request creates a form or updates an existing one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RenderType {
	/// Add the form (or another component of it) to its renderer group.
	#[default]
	Render,
	/// Push new data into an already rendered form.
	Updating,
}

impl RenderType {
	/// Decodes the boundary integer; unknown values fall back to [`Self::Render`].
	pub fn from_code(code: i32) -> Self {
		match code {
			1 => Self::Updating,
			_ => Self::Render,
		}
	}

	pub const fn code(self) -> i32 {
		match self {
			Self::Render => 0,
			Self::Updating => 1,
		}
	}
}

/// How the form's UI code was compiled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CompileMode {
	/// Classic bundled JS.
	#[default]
	JsBundle,
	/// ES module output.
	EsModule,
}

impl CompileMode {
	/// Decodes the boundary integer; unknown values fall back to [`Self::JsBundle`].
	pub fn from_code(code: i32) -> Self {
		match code {
			1 => Self::EsModule,
			_ => Self::JsBundle,
		}
	}

	pub const fn code(self) -> i32 {
		match self {
			Self::JsBundle => 0,
			Self::EsModule => 1,
		}
	}

	pub const fn is_bundle(self) -> bool {
		matches!(self, Self::JsBundle)
	}
}

/// Description of a form as handed over by the form manager.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormJsInfo {
	pub form_id: FormId,
	pub form_name: String,
	pub bundle_name: String,
	pub ability_name: String,
	pub module_name: String,
	/// Path of the HAP holding the form's UI code.
	pub js_form_code_path: String,
	/// Serialized provider data.
	pub form_data: String,
	pub form_src: String,
	pub form_temp_flag: bool,
}

impl FormJsInfo {
	pub fn new(form_id: i64, bundle_name: impl Into<String>, module_name: impl Into<String>) -> Self {
		Self {
			form_id: FormId(form_id),
			bundle_name: bundle_name.into(),
			module_name: module_name.into(),
			..Self::default()
		}
	}

	/// Key of the module context this form renders in.
	pub fn module_key(&self) -> ModuleContextKey {
		ModuleContextKey::new(&self.bundle_name, &self.module_name)
	}
}
