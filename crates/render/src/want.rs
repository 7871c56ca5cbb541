//! Boundary adapter between the IPC property bag and typed requests.
//!
//! [`Want`] mirrors the string-keyed bag the form manager sends. It is read
//! exactly once, by [`RenderRequest::from_want`]; everything past that point
//! works with typed fields.

use std::collections::HashMap;

use crate::form::{CompileMode, RecordKey, RenderType};
use crate::host::{HostToken, RemoteObject};

/// Uid of the render record (`userId + bundleName`).
pub const FORM_SUPPLY_UID: &str = "ohos.extra.param.key.form_supply_uid";
/// Remote object identifying the host process.
pub const PARAM_FORM_HOST_TOKEN: &str = "ohos.extra.param.key.form_host_token";
/// Render type: 0 render, 1 updating.
pub const FORM_RENDER_TYPE_KEY: &str = "ohos.extra.param.key.form_render_type";
/// Component id inside a form's renderer group.
pub const FORM_RENDER_COMP_ID: &str = "ohos.extra.param.key.form_comp_id";
/// Compile mode: 0 js-bundle, 1 es-module.
pub const FORM_COMPILE_MODE_KEY: &str = "ohos.extra.param.key.form_compile_mode";
/// Connection id of the form manager's supply callback.
pub const FORM_CONNECT_ID: &str = "ohos.extra.param.key.form_connect_id";

/// One typed value in a [`Want`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WantParam {
	String(String),
	Int(i32),
	Remote(RemoteObject),
}

/// Opaque property bag passed across the IPC boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Want {
	params: HashMap<String, WantParam>,
}

impl Want {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn set_string_param(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
		self.params.insert(key.into(), WantParam::String(value.into()));
		self
	}

	pub fn set_int_param(&mut self, key: impl Into<String>, value: i32) -> &mut Self {
		self.params.insert(key.into(), WantParam::Int(value));
		self
	}

	pub fn set_remote_object(&mut self, key: impl Into<String>, value: RemoteObject) -> &mut Self {
		self.params.insert(key.into(), WantParam::Remote(value));
		self
	}

	/// String value for `key`; empty when absent or of another type.
	pub fn get_string_param(&self, key: &str) -> String {
		match self.params.get(key) {
			Some(WantParam::String(value)) => value.clone(),
			_ => String::new(),
		}
	}

	/// Int value for `key`, or `default` when absent or of another type.
	pub fn get_int_param(&self, key: &str, default: i32) -> i32 {
		match self.params.get(key) {
			Some(WantParam::Int(value)) => *value,
			_ => default,
		}
	}

	pub fn get_remote_object(&self, key: &str) -> Option<RemoteObject> {
		match self.params.get(key) {
			Some(WantParam::Remote(value)) => Some(value.clone()),
			_ => None,
		}
	}
}

/// Typed view of a render, stop or reload request.
///
/// The caller's [`Want`] is kept so supply callbacks receive exactly what the
/// caller sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderRequest {
	pub uid: Option<RecordKey>,
	pub host_token: Option<HostToken>,
	pub render_type: RenderType,
	/// Component to operate on; `None` addresses the whole form.
	pub comp_id: Option<String>,
	pub compile_mode: CompileMode,
	pub connect_id: i32,
	pub want: Want,
}

impl RenderRequest {
	/// Request for `uid` with defaults for every other field.
	pub fn new(uid: impl Into<RecordKey>) -> Self {
		Self {
			uid: Some(uid.into()),
			..Self::default()
		}
	}

	/// Reads every well-known key from `want`.
	pub fn from_want(want: Want) -> Self {
		let uid = Some(want.get_string_param(FORM_SUPPLY_UID)).filter(|uid| !uid.is_empty()).map(RecordKey::from);
		let comp_id = Some(want.get_string_param(FORM_RENDER_COMP_ID)).filter(|id| !id.is_empty());
		Self {
			uid,
			host_token: want.get_remote_object(PARAM_FORM_HOST_TOKEN),
			render_type: RenderType::from_code(want.get_int_param(FORM_RENDER_TYPE_KEY, RenderType::Render.code())),
			comp_id,
			compile_mode: CompileMode::from_code(want.get_int_param(FORM_COMPILE_MODE_KEY, CompileMode::JsBundle.code())),
			connect_id: want.get_int_param(FORM_CONNECT_ID, 0),
			want,
		}
	}

	pub fn with_host(mut self, host: HostToken) -> Self {
		self.host_token = Some(host);
		self
	}

	pub fn with_comp_id(mut self, comp_id: impl Into<String>) -> Self {
		self.comp_id = Some(comp_id.into()).filter(|id| !id.is_empty());
		self
	}

	pub fn with_render_type(mut self, render_type: RenderType) -> Self {
		self.render_type = render_type;
		self
	}

	pub fn with_compile_mode(mut self, compile_mode: CompileMode) -> Self {
		self.compile_mode = compile_mode;
		self
	}
}
