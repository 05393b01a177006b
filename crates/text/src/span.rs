use std::fmt;

use crate::changeset::Bias;
use crate::error::{SpanError, TrackError};
use crate::line::SnapshotLineRange;
use crate::snapshot::Snapshot;
use crate::tracking::SpanTrackingMode;

/// Half-open character interval `[start, start + len)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Span {
	start: usize,
	len: usize,
}

impl Span {
	/// Creates a span from a start offset and length.
	pub const fn new(start: usize, len: usize) -> Self {
		Self { start, len }
	}

	/// Creates a span from `[start, end)`.
	pub fn from_bounds(start: usize, end: usize) -> Self {
		debug_assert!(start <= end, "span start {start} after end {end}");
		Self::new(start, end.saturating_sub(start))
	}

	/// Start offset (inclusive).
	#[inline]
	pub const fn start(&self) -> usize {
		self.start
	}

	/// End offset (exclusive).
	#[inline]
	pub const fn end(&self) -> usize {
		self.start + self.len
	}

	/// Length in characters.
	#[inline]
	pub const fn len(&self) -> usize {
		self.len
	}

	/// Returns true for zero-length spans.
	#[inline]
	pub const fn is_empty(&self) -> bool {
		self.len == 0
	}

	/// Whether `pos` lies inside the span (exclusive of the end).
	pub fn contains(&self, pos: usize) -> bool {
		pos >= self.start && pos < self.end()
	}

	/// Whether the two spans share at least one character.
	pub fn overlaps(&self, other: &Span) -> bool {
		self.start.max(other.start) < self.end().min(other.end())
	}

	/// Overlap test used for tag queries.
	///
	/// Non-empty spans must share a character. An empty span intersects a span
	/// whose closed range `[start, end]` contains it.
	pub fn intersects_with(&self, other: &Span) -> bool {
		if self.is_empty() || other.is_empty() {
			self.start.max(other.start) <= self.end().min(other.end())
		} else {
			self.overlaps(other)
		}
	}

	/// Shared region of the two spans, if they overlap or touch.
	pub fn intersection(&self, other: &Span) -> Option<Span> {
		let start = self.start.max(other.start);
		let end = self.end().min(other.end());
		(start <= end).then(|| Span::from_bounds(start, end))
	}

	/// Smallest span covering both.
	pub fn cover(&self, other: &Span) -> Span {
		Span::from_bounds(self.start.min(other.start), self.end().max(other.end()))
	}
}

impl fmt::Display for Span {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "[{}..{})", self.start, self.end())
	}
}

/// A [`Span`] bound to the snapshot it was measured against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotSpan {
	snapshot: Snapshot,
	span: Span,
}

impl SnapshotSpan {
	/// Binds `span` to `snapshot`, rejecting spans past the document end.
	pub fn new(snapshot: Snapshot, span: Span) -> Result<Self, SpanError> {
		let len = snapshot.len_chars();
		if span.end() > len {
			return Err(SpanError::OutOfBounds {
				start: span.start(),
				end: span.end(),
				len,
			});
		}
		Ok(Self { snapshot, span })
	}

	pub(crate) fn new_unchecked(snapshot: Snapshot, span: Span) -> Self {
		debug_assert!(span.end() <= snapshot.len_chars());
		Self { snapshot, span }
	}

	/// Snapshot the span is measured against.
	pub fn snapshot(&self) -> &Snapshot {
		&self.snapshot
	}

	/// The raw character span.
	pub fn span(&self) -> Span {
		self.span
	}

	/// Start offset (inclusive).
	pub fn start(&self) -> usize {
		self.span.start()
	}

	/// End offset (exclusive).
	pub fn end(&self) -> usize {
		self.span.end()
	}

	/// Length in characters.
	pub fn len(&self) -> usize {
		self.span.len()
	}

	/// Returns true for zero-length spans.
	pub fn is_empty(&self) -> bool {
		self.span.is_empty()
	}

	/// Text covered by the span.
	pub fn text(&self) -> String {
		self.snapshot.text().slice(self.start()..self.end()).to_string()
	}

	/// Lines touched by the span.
	pub fn line_range(&self) -> SnapshotLineRange {
		SnapshotLineRange::from_span(self)
	}

	/// Tag-query intersection; false for spans on different snapshots.
	pub fn intersects_with(&self, other: &SnapshotSpan) -> bool {
		self.snapshot == other.snapshot && self.span.intersects_with(&other.span)
	}

	/// Shared region on the same snapshot, if any.
	pub fn intersection(&self, other: &SnapshotSpan) -> Option<SnapshotSpan> {
		if self.snapshot != other.snapshot {
			return None;
		}
		self.span
			.intersection(&other.span)
			.map(|span| Self::new_unchecked(self.snapshot.clone(), span))
	}

	/// Smallest span covering both; `None` for different snapshots.
	pub fn cover(&self, other: &SnapshotSpan) -> Option<SnapshotSpan> {
		(self.snapshot == other.snapshot).then(|| Self::new_unchecked(self.snapshot.clone(), self.span.cover(&other.span)))
	}

	/// Maps the span forward onto `target`.
	///
	/// Fails when `target` is another buffer, an older version, or when a
	/// non-empty span was deleted entirely.
	pub fn translate_to(&self, target: &Snapshot, mode: SpanTrackingMode) -> Result<SnapshotSpan, TrackError> {
		if *target == self.snapshot {
			return Ok(self.clone());
		}
		let (start_bias, end_bias) = match mode {
			SpanTrackingMode::EdgeExclusive => (Bias::Right, Bias::Left),
			SpanTrackingMode::EdgeInclusive => (Bias::Left, Bias::Right),
		};
		let start = self.snapshot.map_pos_to(self.start(), target, start_bias)?;
		let end = self.snapshot.map_pos_to(self.end(), target, end_bias)?.max(start);
		if !self.is_empty() && start == end {
			return Err(TrackError::Deleted);
		}
		Ok(Self::new_unchecked(target.clone(), Span::from_bounds(start, end)))
	}
}

impl fmt::Display for SnapshotSpan {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "v{}{}", self.snapshot.version(), self.span)
	}
}

/// Sorted, merged set of spans on a single snapshot.
///
/// Overlapping or touching spans are merged on construction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NormalizedSnapshotSpanCollection {
	spans: Vec<SnapshotSpan>,
}

impl NormalizedSnapshotSpanCollection {
	/// Normalizes `spans`. All spans must share one snapshot.
	pub fn new(spans: impl IntoIterator<Item = SnapshotSpan>) -> Result<Self, SpanError> {
		let mut spans: Vec<SnapshotSpan> = spans.into_iter().collect();
		let Some(first) = spans.first() else {
			return Ok(Self::default());
		};
		let snapshot = first.snapshot().clone();
		if spans.iter().any(|s| *s.snapshot() != snapshot) {
			return Err(SpanError::MixedSnapshots);
		}

		spans.sort_by_key(|s| (s.start(), s.end()));
		let mut merged: Vec<SnapshotSpan> = Vec::with_capacity(spans.len());
		for span in spans {
			match merged.last_mut() {
				Some(last) if span.start() <= last.end() => {
					last.span = last.span.cover(&span.span);
				}
				_ => merged.push(span),
			}
		}
		Ok(Self { spans: merged })
	}

	/// Collection holding one span.
	pub fn from_span(span: SnapshotSpan) -> Self {
		Self { spans: vec![span] }
	}

	/// Spans in ascending order.
	pub fn iter(&self) -> std::slice::Iter<'_, SnapshotSpan> {
		self.spans.iter()
	}

	/// Number of spans.
	pub fn len(&self) -> usize {
		self.spans.len()
	}

	/// Returns true if there are no spans.
	pub fn is_empty(&self) -> bool {
		self.spans.is_empty()
	}

	/// Snapshot shared by all spans.
	pub fn snapshot(&self) -> Option<&Snapshot> {
		self.spans.first().map(SnapshotSpan::snapshot)
	}

	/// Span from the first start to the last end.
	pub fn overarching(&self) -> Option<SnapshotSpan> {
		let first = self.spans.first()?;
		let last = self.spans.last()?;
		Some(SnapshotSpan::new_unchecked(
			first.snapshot().clone(),
			Span::from_bounds(first.start(), last.end()),
		))
	}
}

impl<'a> IntoIterator for &'a NormalizedSnapshotSpanCollection {
	type Item = &'a SnapshotSpan;
	type IntoIter = std::slice::Iter<'a, SnapshotSpan>;

	fn into_iter(self) -> Self::IntoIter {
		self.spans.iter()
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::snapshot::TextBuffer;

	#[test]
	fn span_intersection_rules() {
		let a = Span::new(0, 4);
		assert!(a.intersects_with(&Span::new(3, 2)));
		assert!(!a.intersects_with(&Span::new(4, 2)));
		assert!(a.intersects_with(&Span::new(4, 0)));
		assert!(Span::new(2, 0).intersects_with(&a));
		assert_eq!(a.intersection(&Span::new(2, 10)), Some(Span::new(2, 2)));
		assert_eq!(a.intersection(&Span::new(6, 1)), None);
		assert_eq!(a.cover(&Span::new(6, 1)), Span::new(0, 7));
	}

	#[test]
	fn snapshot_span_rejects_out_of_bounds() {
		let snapshot = TextBuffer::new("abc").current();
		assert!(SnapshotSpan::new(snapshot.clone(), Span::new(1, 2)).is_ok());
		assert_eq!(
			SnapshotSpan::new(snapshot, Span::new(2, 2)),
			Err(SpanError::OutOfBounds { start: 2, end: 4, len: 3 })
		);
	}

	#[test]
	fn normalized_collection_merges_and_sorts() {
		let snapshot = TextBuffer::new("0123456789").current();
		let at = |start, len| SnapshotSpan::new(snapshot.clone(), Span::new(start, len)).unwrap();
		let spans = NormalizedSnapshotSpanCollection::new([at(6, 2), at(0, 2), at(2, 1), at(7, 3)]).unwrap();
		let raw: Vec<Span> = spans.iter().map(SnapshotSpan::span).collect();
		assert_eq!(raw, vec![Span::new(0, 3), Span::new(6, 4)]);
		assert_eq!(spans.overarching().unwrap().span(), Span::new(0, 10));
	}

	#[test]
	fn normalized_collection_rejects_mixed_snapshots() {
		let mut buffer = TextBuffer::new("abc");
		let v0 = buffer.current().extent();
		let v1 = buffer.insert(0, "x").extent();
		assert_eq!(NormalizedSnapshotSpanCollection::new([v0, v1]), Err(SpanError::MixedSnapshots));
		assert!(NormalizedSnapshotSpanCollection::new(Vec::new()).unwrap().overarching().is_none());
	}

	#[test]
	fn translate_forward_and_fail_on_delete() {
		let mut buffer = TextBuffer::new("cat\ndog\nbear");
		let v0 = buffer.current();
		let dog = SnapshotSpan::new(v0.clone(), Span::new(4, 3)).unwrap();
		let v1 = buffer.insert(0, "xx");
		assert_eq!(dog.translate_to(&v1, SpanTrackingMode::EdgeExclusive).unwrap().span(), Span::new(6, 3));
		let v2 = buffer.delete(5, 10);
		assert_eq!(dog.translate_to(&v2, SpanTrackingMode::EdgeExclusive), Err(TrackError::Deleted));
		assert!(dog.translate_to(&v0, SpanTrackingMode::EdgeExclusive).is_ok());
		let later = SnapshotSpan::new(v1, Span::new(0, 1)).unwrap();
		assert!(matches!(
			later.translate_to(&v0, SpanTrackingMode::EdgeExclusive),
			Err(TrackError::Backward { .. })
		));
	}

	#[test]
	fn tracking_modes_differ_at_edges() {
		let mut buffer = TextBuffer::new("abcdef");
		let v0 = buffer.current();
		let span = SnapshotSpan::new(v0, Span::new(2, 2)).unwrap();
		let v1 = buffer.insert(2, "__");
		assert_eq!(span.translate_to(&v1, SpanTrackingMode::EdgeExclusive).unwrap().span(), Span::new(4, 2));
		assert_eq!(span.translate_to(&v1, SpanTrackingMode::EdgeInclusive).unwrap().span(), Span::new(2, 4));
	}
}
