use std::any::Any;

/// Extracts a readable message from a caught panic payload.
///
/// Returns `None` for payloads that are neither `&str` nor `String`.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> Option<String> {
	if let Some(msg) = payload.downcast_ref::<&'static str>() {
		return Some((*msg).to_string());
	}
	payload.downcast_ref::<String>().cloned()
}
