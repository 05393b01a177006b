//! Contracts implemented by tag providers.

use std::fmt::Debug;
use std::hash::Hash;
use std::time::Duration;

use tagflow_text::{Snapshot, SnapshotLineRange, SnapshotSpan};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::error::TagSourceError;

/// Bound satisfied by every tag value.
///
/// Tags are opaque to the engine; equality and hashing are only used to
/// decide whether freshly computed tags differ from predicted ones.
pub trait Tag: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

impl<T> Tag for T where T: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

/// A tag attached to a span of one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TagSpan<T> {
	/// Where the tag applies.
	pub span: SnapshotSpan,
	/// Source-defined value.
	pub tag: T,
}

impl<T> TagSpan<T> {
	/// Attaches `tag` to `span`.
	pub fn new(span: SnapshotSpan, tag: T) -> Self {
		Self { span, tag }
	}
}

/// A tag provider whose classification is too slow for the foreground.
///
/// `data_for_snapshot`, `try_tags_prompt` and `visible_line_range` are only
/// called on the foreground. `tags_in_background` runs on the blocking pool
/// and may be called while the foreground is also calling into the source.
pub trait AsyncTagSource: Send + Sync + 'static {
	/// Immutable, foreground-captured state handed to the background job.
	type Data: Send + Sync + 'static;
	/// Tag value produced by this source.
	type Tag: Tag;

	/// Minimum wait before a new background job starts classifying.
	fn delay(&self) -> Option<Duration> {
		None
	}

	/// Captures everything the background job needs for `snapshot`.
	fn data_for_snapshot(&self, snapshot: &Snapshot) -> Self::Data;

	/// Classifies `span`, observing `cancel`.
	fn tags_in_background(
		&self,
		data: &Self::Data,
		span: &SnapshotSpan,
		cancel: &CancellationToken,
	) -> Result<Vec<TagSpan<Self::Tag>>, TagSourceError>;

	/// Fast synchronous answer for `span`, bypassing cache and background work.
	fn try_tags_prompt(&self, _span: &SnapshotSpan) -> Option<Vec<TagSpan<Self::Tag>>> {
		None
	}

	/// Lines currently on screen; classified ahead of any other request.
	fn visible_line_range(&self) -> Option<SnapshotLineRange> {
		None
	}

	/// Subscribes to the source's `Changed` event.
	///
	/// Every message means "all previously computed tags are invalid".
	/// Dropping the receiver unsubscribes.
	fn subscribe_changed(&self) -> Option<broadcast::Receiver<()>> {
		None
	}
}

/// A tag provider cheap enough to run synchronously on the foreground.
pub trait BasicTagSource: Send + Sync + 'static {
	/// Tag value produced by this source.
	type Tag: Tag;

	/// Tags intersecting `span`.
	fn tags(&self, span: &SnapshotSpan) -> Vec<TagSpan<Self::Tag>>;

	/// Subscribes to the source's `Changed` event. Dropping the receiver unsubscribes.
	fn subscribe_changed(&self) -> Option<broadcast::Receiver<()>> {
		None
	}
}

