/// Thread classes used for naming and observability of dedicated threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// Per-record event loop that owns an embedded runtime and its UI trees.
	Render,
	/// Periodic service upkeep such as liveness probing.
	Housekeeping,
}

impl TaskClass {
	pub(crate) const fn as_str(self) -> &'static str {
		match self {
			Self::Render => "render",
			Self::Housekeeping => "housekeeping",
		}
	}
}
