use parking_lot::Mutex;
use tagflow_text::LineRange;

#[derive(Debug, Default)]
struct ChannelState {
	version: u64,
	stack: Vec<LineRange>,
	visible_lines: Option<LineRange>,
}

/// Work queue between the foreground and one background job.
///
/// Two lanes: a LIFO stack of requested line ranges and a single
/// visible-lines slot that always wins. Every operation is non-blocking;
/// the lock is only held for the push/pop itself.
#[derive(Debug, Default)]
pub struct Channel {
	state: Mutex<ChannelState>,
}

impl Channel {
	/// Creates an empty channel at version 0.
	pub fn new() -> Self {
		Self::default()
	}

	/// Pushes `range` onto the normal stack.
	pub fn write_normal(&self, range: LineRange) {
		let mut state = self.state.lock();
		state.stack.push(range);
		state.version += 1;
		tracing::trace!(%range, version = state.version, "tagger.channel.write_normal");
	}

	/// Replaces the visible-lines slot. Leaves the normal stack alone.
	pub fn write_visible_lines(&self, range: LineRange) {
		let mut state = self.state.lock();
		state.visible_lines = Some(range);
		state.version += 1;
		tracing::trace!(%range, version = state.version, "tagger.channel.write_visible_lines");
	}

	/// Takes the next range: visible lines first, then the newest normal entry.
	pub fn read(&self) -> Option<LineRange> {
		let mut state = self.state.lock();
		let range = state.visible_lines.take().or_else(|| state.stack.pop());
		if let Some(range) = range {
			tracing::trace!(%range, "tagger.channel.read");
		}
		range
	}

	/// Number of writes so far. Reads do not change it.
	pub fn current_version(&self) -> u64 {
		self.state.lock().version
	}

	/// Pending normal entries, oldest first.
	pub fn current_stack(&self) -> Vec<LineRange> {
		self.state.lock().stack.clone()
	}

	/// Pending visible-lines entry.
	pub fn visible_lines(&self) -> Option<LineRange> {
		self.state.lock().visible_lines
	}

	/// Whether anything is waiting to be read.
	pub fn has_pending(&self) -> bool {
		let state = self.state.lock();
		state.visible_lines.is_some() || !state.stack.is_empty()
	}
}
