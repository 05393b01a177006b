/// Execution classes used for worker scheduling and observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// Async coordination that drives a background request.
	Background,
	/// CPU-bound classification executed on the blocking pool.
	CpuBlocking,
}

impl TaskClass {
	pub(crate) const fn as_str(self) -> &'static str {
		match self {
			Self::Background => "background",
			Self::CpuBlocking => "cpu_blocking",
		}
	}
}
