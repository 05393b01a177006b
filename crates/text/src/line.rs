use std::fmt;

use crate::snapshot::Snapshot;
use crate::span::SnapshotSpan;

/// Half-open range of lines `[start_line, start_line + count)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct LineRange {
	start_line: usize,
	count: usize,
}

impl LineRange {
	/// Creates a range of `count` lines starting at `start_line`.
	pub const fn new(start_line: usize, count: usize) -> Self {
		Self { start_line, count }
	}

	/// Creates the range `[start_line, end_line)`.
	pub fn from_bounds(start_line: usize, end_line: usize) -> Self {
		Self::new(start_line, end_line.saturating_sub(start_line))
	}

	/// First line.
	#[inline]
	pub const fn start_line(&self) -> usize {
		self.start_line
	}

	/// Number of lines.
	#[inline]
	pub const fn count(&self) -> usize {
		self.count
	}

	/// One past the last line.
	#[inline]
	pub const fn end_line(&self) -> usize {
		self.start_line + self.count
	}

	/// Returns true for ranges of zero lines.
	#[inline]
	pub const fn is_empty(&self) -> bool {
		self.count == 0
	}

	/// Whether `line` is inside the range.
	pub fn contains_line(&self, line: usize) -> bool {
		line >= self.start_line && line < self.end_line()
	}

	/// Whether `other` lies entirely inside this range.
	pub fn contains(&self, other: &LineRange) -> bool {
		other.start_line >= self.start_line && other.end_line() <= self.end_line()
	}

	/// Whether the ranges share a line.
	pub fn intersects(&self, other: &LineRange) -> bool {
		self.start_line.max(other.start_line) < self.end_line().min(other.end_line())
	}

	/// Whether the ranges share a line or sit directly next to each other.
	pub fn touches(&self, other: &LineRange) -> bool {
		self.start_line.max(other.start_line) <= self.end_line().min(other.end_line())
	}

	/// Lines shared by both ranges.
	pub fn intersection(&self, other: &LineRange) -> Option<LineRange> {
		self.intersects(other)
			.then(|| LineRange::from_bounds(self.start_line.max(other.start_line), self.end_line().min(other.end_line())))
	}

	/// Smallest range covering both.
	pub fn union(&self, other: &LineRange) -> LineRange {
		LineRange::from_bounds(self.start_line.min(other.start_line), self.end_line().max(other.end_line()))
	}
}

impl fmt::Display for LineRange {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "lines[{}..{})", self.start_line, self.end_line())
	}
}

/// A [`LineRange`] bound to a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotLineRange {
	snapshot: Snapshot,
	range: LineRange,
}

impl SnapshotLineRange {
	/// Binds `range` to `snapshot`, clipping lines past the end of the document.
	pub fn new(snapshot: Snapshot, range: LineRange) -> Self {
		let line_count = snapshot.line_count();
		let start = range.start_line().min(line_count);
		let end = range.end_line().min(line_count);
		Self {
			snapshot,
			range: LineRange::from_bounds(start, end),
		}
	}

	/// Lines touched by `span`. An empty span touches the line it sits on.
	pub fn from_span(span: &SnapshotSpan) -> Self {
		let snapshot = span.snapshot().clone();
		let start_line = snapshot.line_of(span.start());
		let last_line = if span.is_empty() {
			start_line
		} else {
			snapshot.line_of(span.end() - 1)
		};
		Self {
			snapshot,
			range: LineRange::from_bounds(start_line, last_line + 1),
		}
	}

	/// Snapshot the lines belong to.
	pub fn snapshot(&self) -> &Snapshot {
		&self.snapshot
	}

	/// The unbound line range.
	pub fn line_range(&self) -> LineRange {
		self.range
	}

	/// First line.
	pub fn start_line(&self) -> usize {
		self.range.start_line()
	}

	/// Number of lines.
	pub fn count(&self) -> usize {
		self.range.count()
	}

	/// Span of the lines including the final line break.
	pub fn extent_including_line_break(&self) -> SnapshotSpan {
		self.snapshot.line_range_extent(self.range)
	}
}
