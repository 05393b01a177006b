use thiserror::Error;

/// Failure to map a span or position onto another snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TrackError {
	/// The target snapshot belongs to another buffer.
	#[error("snapshot belongs to a different buffer")]
	DifferentBuffer,
	/// The target snapshot is older than the source; only forward mapping exists.
	#[error("cannot map backward from version {from} to version {to}")]
	Backward {
		/// Version the span was created against.
		from: u64,
		/// Version mapping was requested for.
		to: u64,
	},
	/// The edit history no longer covers the requested versions.
	#[error("edit history does not reach version {0}")]
	MissingHistory(u64),
	/// Every character of the tracked span was deleted.
	#[error("tracked span was deleted")]
	Deleted,
}

/// Invalid span construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SpanError {
	/// A collection mixed spans from different snapshots.
	#[error("spans belong to different snapshots")]
	MixedSnapshots,
	/// The span extends past the end of its snapshot.
	#[error("span {start}..{end} exceeds snapshot length {len}")]
	OutOfBounds {
		/// Span start.
		start: usize,
		/// Span end (exclusive).
		end: usize,
		/// Snapshot length in characters.
		len: usize,
	},
}
