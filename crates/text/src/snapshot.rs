use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use ropey::Rope;

use crate::changeset::{Bias, ChangeSet};
use crate::error::TrackError;
use crate::line::LineRange;
use crate::span::{Span, SnapshotSpan};

static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one [`TextBuffer`] across all of its versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(u64);

impl BufferId {
	fn next() -> Self {
		Self(NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed))
	}
}

/// Append-only edit log shared by every snapshot of a buffer.
///
/// `edits[v]` takes version `v` to version `v + 1`.
#[derive(Debug, Default)]
struct History {
	edits: RwLock<Vec<ChangeSet>>,
}

impl History {
	fn push(&self, cs: ChangeSet) -> u64 {
		let mut edits = self.edits.write();
		edits.push(cs);
		edits.len() as u64
	}

	fn map_pos(&self, from: u64, to: u64, pos: usize, bias: Bias) -> Result<usize, TrackError> {
		if to < from {
			return Err(TrackError::Backward { from, to });
		}
		let edits = self.edits.read();
		if to as usize > edits.len() {
			return Err(TrackError::MissingHistory(to));
		}
		Ok(edits[from as usize..to as usize].iter().fold(pos, |pos, cs| cs.map_pos(pos, bias)))
	}
}

struct SnapshotInner {
	buffer: BufferId,
	version: u64,
	text: Rope,
	history: Arc<History>,
}

/// Immutable view of a buffer at one version.
///
/// Cloning is cheap. Two snapshots are equal only when they are the same
/// version of the same buffer.
#[derive(Clone)]
pub struct Snapshot {
	inner: Arc<SnapshotInner>,
}

impl Snapshot {
	/// Buffer this snapshot belongs to.
	pub fn buffer_id(&self) -> BufferId {
		self.inner.buffer
	}

	/// Monotonic version number, starting at 0.
	pub fn version(&self) -> u64 {
		self.inner.version
	}

	/// Document text at this version.
	pub fn text(&self) -> &Rope {
		&self.inner.text
	}

	/// Document length in characters.
	pub fn len_chars(&self) -> usize {
		self.inner.text.len_chars()
	}

	/// Number of lines. An empty document has one empty line.
	pub fn line_count(&self) -> usize {
		self.inner.text.len_lines()
	}

	/// Character offset of the first character of `line`.
	///
	/// `line` is clamped to the last line.
	pub fn line_start(&self, line: usize) -> usize {
		self.inner.text.line_to_char(line.min(self.line_count() - 1))
	}

	/// Line containing the character offset `pos` (clamped to the document).
	pub fn line_of(&self, pos: usize) -> usize {
		self.inner.text.char_to_line(pos.min(self.len_chars()))
	}

	/// Span covering the whole document.
	pub fn extent(&self) -> SnapshotSpan {
		SnapshotSpan::new_unchecked(self.clone(), Span::new(0, self.len_chars()))
	}

	/// Line range covering every line of the document.
	pub fn lines(&self) -> LineRange {
		LineRange::new(0, self.line_count())
	}

	/// Span covering `range`, including the trailing line break of its last line.
	///
	/// Lines past the end of the document are ignored.
	pub fn line_range_extent(&self, range: LineRange) -> SnapshotSpan {
		let line_count = self.line_count();
		let start_line = range.start_line().min(line_count);
		let end_line = range.end_line().min(line_count);
		let start = if start_line >= line_count { self.len_chars() } else { self.line_start(start_line) };
		let end = if end_line >= line_count {
			self.len_chars()
		} else {
			self.inner.text.line_to_char(end_line)
		};
		SnapshotSpan::new_unchecked(self.clone(), Span::from_bounds(start, end.max(start)))
	}

	/// Whether `self` is an earlier version of the same buffer as `other`.
	pub fn is_older_than(&self, other: &Snapshot) -> bool {
		self.buffer_id() == other.buffer_id() && self.version() < other.version()
	}

	/// Maps a position in this snapshot onto `target`.
	pub fn map_pos_to(&self, pos: usize, target: &Snapshot, bias: Bias) -> Result<usize, TrackError> {
		if self.buffer_id() != target.buffer_id() {
			return Err(TrackError::DifferentBuffer);
		}
		self.inner.history.map_pos(self.version(), target.version(), pos, bias)
	}
}

impl PartialEq for Snapshot {
	fn eq(&self, other: &Self) -> bool {
		self.inner.buffer == other.inner.buffer && self.inner.version == other.inner.version
	}
}

impl Eq for Snapshot {}

impl Hash for Snapshot {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.inner.buffer.hash(state);
		self.inner.version.hash(state);
	}
}

impl fmt::Debug for Snapshot {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Snapshot")
			.field("buffer", &self.inner.buffer)
			.field("version", &self.inner.version)
			.field("len_chars", &self.len_chars())
			.finish()
	}
}

/// Mutable, versioned document.
pub struct TextBuffer {
	current: Snapshot,
}

impl TextBuffer {
	/// Creates a buffer at version 0 holding `text`.
	pub fn new(text: &str) -> Self {
		Self {
			current: Snapshot {
				inner: Arc::new(SnapshotInner {
					buffer: BufferId::next(),
					version: 0,
					text: Rope::from(text),
					history: Arc::new(History::default()),
				}),
			},
		}
	}

	/// Latest snapshot.
	pub fn current(&self) -> Snapshot {
		self.current.clone()
	}

	/// Replaces chars `[start, end)` with `replacement`, producing the next version.
	///
	/// Bounds are clamped to the document.
	pub fn edit(&mut self, start: usize, end: usize, replacement: &str) -> Snapshot {
		let len = self.current.len_chars();
		let end = end.min(len);
		let start = start.min(end);
		let cs = ChangeSet::replace(len, start, end, replacement);

		let mut text = self.current.inner.text.clone();
		cs.apply(&mut text);

		let history = Arc::clone(&self.current.inner.history);
		let version = history.push(cs);
		self.current = Snapshot {
			inner: Arc::new(SnapshotInner {
				buffer: self.current.inner.buffer,
				version,
				text,
				history,
			}),
		};
		self.current()
	}

	/// Inserts `text` at `pos`.
	pub fn insert(&mut self, pos: usize, text: &str) -> Snapshot {
		self.edit(pos, pos, text)
	}

	/// Deletes chars `[start, end)`.
	pub fn delete(&mut self, start: usize, end: usize) -> Snapshot {
		self.edit(start, end, "")
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn edits_bump_version_and_keep_identity() {
		let mut buffer = TextBuffer::new("cat\ndog\nbear");
		let v0 = buffer.current();
		let v1 = buffer.insert(0, "x");
		assert_eq!(v0.version(), 0);
		assert_eq!(v1.version(), 1);
		assert_eq!(v0.buffer_id(), v1.buffer_id());
		assert_ne!(v0, v1);
		assert_eq!(v0, v0.clone());
		assert!(v0.is_older_than(&v1));
		assert_eq!(v1.text().to_string(), "xcat\ndog\nbear");
		assert_eq!(v0.text().to_string(), "cat\ndog\nbear");
	}

	#[test]
	fn snapshots_of_different_buffers_differ() {
		let a = TextBuffer::new("same").current();
		let b = TextBuffer::new("same").current();
		assert_ne!(a, b);
		assert_eq!(a.map_pos_to(0, &b, Bias::Left), Err(TrackError::DifferentBuffer));
	}

	#[test]
	fn line_addressing() {
		let snapshot = TextBuffer::new("cat\ndog\nbear").current();
		assert_eq!(snapshot.line_count(), 3);
		assert_eq!(snapshot.line_start(1), 4);
		assert_eq!(snapshot.line_of(5), 1);
		assert_eq!(snapshot.line_of(100), 2);
		assert_eq!(snapshot.line_range_extent(LineRange::new(1, 1)).span(), Span::new(4, 4));
		assert_eq!(snapshot.line_range_extent(LineRange::new(2, 5)).span(), Span::new(8, 4));
		assert_eq!(snapshot.line_range_extent(snapshot.lines()).span(), Span::new(0, 12));
	}

	#[test]
	fn map_pos_across_versions() {
		let mut buffer = TextBuffer::new("abcdef");
		let v0 = buffer.current();
		buffer.insert(0, "xx");
		let v2 = buffer.delete(4, 6);
		assert_eq!(v2.text().to_string(), "xxabef");
		assert_eq!(v0.map_pos_to(1, &v2, Bias::Left), Ok(3));
		assert_eq!(v0.map_pos_to(3, &v2, Bias::Left), Ok(4));
		assert_eq!(v0.map_pos_to(5, &v2, Bias::Left), Ok(5));
		assert_eq!(v2.map_pos_to(0, &v0, Bias::Left), Err(TrackError::Backward { from: 2, to: 0 }));
	}
}
