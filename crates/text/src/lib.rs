//! Host document model for the tagging engine.
//!
//! A [`TextBuffer`] is the mutable document. Every edit produces a new
//! immutable [`Snapshot`]; spans are always tied to exactly one snapshot and
//! move forward across edits only through [`TrackingSpan`] /
//! [`SnapshotSpan::translate_to`].

/// Edit deltas and position mapping.
pub mod changeset;
/// Error types for span construction and tracking.
pub mod error;
/// Line addressing: line ranges and their snapshot-bound form.
pub mod line;
/// Versioned buffers and their immutable snapshots.
pub mod snapshot;
/// Character spans, snapshot spans and normalized collections.
pub mod span;
/// Forward span tracking across edits.
pub mod tracking;

pub use changeset::{Bias, ChangeSet, Operation};
pub use error::{SpanError, TrackError};
pub use line::{LineRange, SnapshotLineRange};
pub use ropey::Rope;
pub use snapshot::{BufferId, Snapshot, TextBuffer};
pub use span::{NormalizedSnapshotSpanCollection, Span, SnapshotSpan};
pub use tracking::{SpanTrackingMode, TrackingSpan};
