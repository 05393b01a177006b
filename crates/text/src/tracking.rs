use crate::error::TrackError;
use crate::snapshot::Snapshot;
use crate::span::SnapshotSpan;

/// How span edges react to text inserted exactly at them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SpanTrackingMode {
	/// Insertions at either edge stay outside the span.
	#[default]
	EdgeExclusive,
	/// Insertions at either edge grow the span.
	EdgeInclusive,
}

/// A span that can be projected onto later versions of its buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackingSpan {
	origin: SnapshotSpan,
	mode: SpanTrackingMode,
}

impl TrackingSpan {
	/// Starts tracking `origin` with the given edge behavior.
	pub fn new(origin: SnapshotSpan, mode: SpanTrackingMode) -> Self {
		Self { origin, mode }
	}

	/// The span as it was created.
	pub fn origin(&self) -> &SnapshotSpan {
		&self.origin
	}

	/// Edge behavior.
	pub fn mode(&self) -> SpanTrackingMode {
		self.mode
	}

	/// Position of the span in `snapshot`.
	pub fn span_at(&self, snapshot: &Snapshot) -> Result<SnapshotSpan, TrackError> {
		self.origin.translate_to(snapshot, self.mode)
	}
}
