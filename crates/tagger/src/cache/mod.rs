//! What the tagger knows about tags: a validated per-snapshot background
//! cache and a best-effort tracking cache projected across edits.

use rustc_hash::{FxHashMap, FxHashSet};
use tagflow_text::{LineRange, Snapshot, SnapshotSpan, SpanTrackingMode, TrackingSpan};

use crate::line_ranges::NormalizedLineRangeCollection;
use crate::source::{Tag, TagSpan};

/// Background classification results for exactly one snapshot.
///
/// `visited` records which lines have been classified; `tags` holds every
/// tag found on those lines. Only valid while the snapshot is current.
#[derive(Debug, Clone)]
pub struct BackgroundCacheData<T> {
	snapshot: Snapshot,
	visited: NormalizedLineRangeCollection,
	tags: Vec<TagSpan<T>>,
}

impl<T: Tag> BackgroundCacheData<T> {
	/// Empty cache for `snapshot`.
	pub fn new(snapshot: Snapshot) -> Self {
		Self {
			snapshot,
			visited: NormalizedLineRangeCollection::new(),
			tags: Vec::new(),
		}
	}

	/// Snapshot the data describes.
	pub fn snapshot(&self) -> &Snapshot {
		&self.snapshot
	}

	/// Classified lines.
	pub fn visited(&self) -> &NormalizedLineRangeCollection {
		&self.visited
	}

	/// Every cached tag.
	pub fn tags(&self) -> &[TagSpan<T>] {
		&self.tags
	}

	/// Records `range` as classified and merges its tags.
	///
	/// A (span, tag) pair already present near `range` is not stored twice,
	/// so tags straddling chunk boundaries stay unique. Tags measured against
	/// another snapshot are dropped.
	pub fn add(&mut self, range: LineRange, tags: impl IntoIterator<Item = TagSpan<T>>) {
		let extent = self.snapshot.line_range_extent(range);
		let mut seen: FxHashSet<TagSpan<T>> = self
			.tags
			.iter()
			.filter(|t| t.span.intersects_with(&extent))
			.cloned()
			.collect();

		for tag in tags {
			if *tag.span.snapshot() != self.snapshot {
				tracing::trace!(span = %tag.span, "tagger.cache.foreign_snapshot_tag");
				continue;
			}
			if seen.insert(tag.clone()) {
				self.tags.push(tag);
			}
		}
		self.visited.add(range);
	}

	/// Whether every line of `range` was classified.
	pub fn covers(&self, range: LineRange) -> bool {
		self.visited.contains(range)
	}

	/// Unclassified parts of `range`.
	pub fn missing(&self, range: LineRange) -> Vec<LineRange> {
		self.visited.missing(range)
	}

	/// Cached tags intersecting `span`.
	pub fn tags_intersecting<'a>(&'a self, span: &'a SnapshotSpan) -> impl Iterator<Item = &'a TagSpan<T>> + 'a {
		self.tags.iter().filter(move |t| t.span.intersects_with(span))
	}
}

/// Tags from a superseded snapshot, kept as tracking spans.
///
/// Used to answer requests on a newer snapshot while its own classification
/// is in flight, and to predict whether fresh results differ from what was
/// already shown. Entries whose text was deleted silently drop out.
#[derive(Debug, Clone)]
pub struct TrackingCacheData<T> {
	overarching: TrackingSpan,
	tags: Vec<(TrackingSpan, T)>,
}

impl<T: Tag> TrackingCacheData<T> {
	/// Demotes `background` into tracking data.
	///
	/// Entries of `previous` lying outside the lines `background` classified
	/// are carried over. Returns `None` when there is nothing to track.
	pub fn from_background(background: &BackgroundCacheData<T>, previous: Option<&TrackingCacheData<T>>) -> Option<Self> {
		let snapshot = &background.snapshot;
		let mut overarching = background.visited.overarching().map(|r| snapshot.line_range_extent(r));
		let mut tags: Vec<(TrackingSpan, T)> = background
			.tags
			.iter()
			.map(|t| (TrackingSpan::new(t.span.clone(), SpanTrackingMode::EdgeExclusive), t.tag.clone()))
			.collect();

		if let Some(previous) = previous
			&& let Some(previous_extent) = previous.overarching_span_at(snapshot)
		{
			for tag in previous.project(snapshot) {
				if !background.visited.intersects(tag.span.line_range().line_range()) {
					tags.push((TrackingSpan::new(tag.span, SpanTrackingMode::EdgeExclusive), tag.tag));
				}
			}
			overarching = Some(match overarching {
				Some(o) => o.cover(&previous_extent).unwrap_or(o),
				None => previous_extent,
			});
		}

		let overarching = overarching?;
		Some(Self {
			overarching: TrackingSpan::new(overarching, SpanTrackingMode::EdgeInclusive),
			tags,
		})
	}

	/// Tracked region as it sits in `snapshot`, if it can still be mapped.
	pub fn overarching_span_at(&self, snapshot: &Snapshot) -> Option<SnapshotSpan> {
		self.overarching.span_at(snapshot).ok()
	}

	/// Number of tracked tags.
	pub fn len(&self) -> usize {
		self.tags.len()
	}

	/// Returns true if no tag is tracked.
	pub fn is_empty(&self) -> bool {
		self.tags.is_empty()
	}

	/// Every tag that still maps onto `snapshot`.
	pub fn project(&self, snapshot: &Snapshot) -> Vec<TagSpan<T>> {
		self.tags
			.iter()
			.filter_map(|(span, tag)| span.span_at(snapshot).ok().map(|span| TagSpan::new(span, tag.clone())))
			.collect()
	}

	/// Projected tags intersecting any of `spans` (all on one snapshot).
	pub fn tags_for(&self, spans: &[SnapshotSpan]) -> Vec<TagSpan<T>> {
		let Some(first) = spans.first() else {
			return Vec::new();
		};
		let Some(extent) = self.overarching_span_at(first.snapshot()) else {
			return Vec::new();
		};
		if !spans.iter().any(|s| s.intersects_with(&extent)) {
			return Vec::new();
		}
		self.project(first.snapshot())
			.into_iter()
			.filter(|t| spans.iter().any(|s| t.span.intersects_with(s)))
			.collect()
	}

	/// What this data predicts for `span`.
	///
	/// `None` means the data says nothing about `span`: the tracked region
	/// was deleted or does not reach it.
	pub fn predicted(&self, span: &SnapshotSpan) -> Option<Vec<TagSpan<T>>> {
		let extent = self.overarching_span_at(span.snapshot())?;
		if !extent.intersects_with(span) {
			return None;
		}
		Some(
			self.project(span.snapshot())
				.into_iter()
				.filter(|t| t.span.intersects_with(span))
				.collect(),
		)
	}
}

/// Everything the tagger has cached. Both halves are optional and independent.
#[derive(Debug, Clone)]
pub struct TagCache<T> {
	background: Option<BackgroundCacheData<T>>,
	tracking: Option<TrackingCacheData<T>>,
}

impl<T> Default for TagCache<T> {
	fn default() -> Self {
		Self {
			background: None,
			tracking: None,
		}
	}
}

impl<T: Tag> TagCache<T> {
	/// Returns true when neither half is present.
	pub fn is_empty(&self) -> bool {
		self.background.is_none() && self.tracking.is_none()
	}

	/// Background data, for whichever snapshot it was computed.
	pub fn background(&self) -> Option<&BackgroundCacheData<T>> {
		self.background.as_ref()
	}

	/// Tracking data.
	pub fn tracking(&self) -> Option<&TrackingCacheData<T>> {
		self.tracking.as_ref()
	}

	/// Background data if it belongs to `snapshot`.
	pub fn background_for(&self, snapshot: &Snapshot) -> Option<&BackgroundCacheData<T>> {
		self.background.as_ref().filter(|bg| bg.snapshot == *snapshot)
	}

	/// Demotes background data for a snapshot older than `current` into tracking data.
	///
	/// Returns true if a demotion happened.
	pub(crate) fn demote_stale(&mut self, current: &Snapshot) -> bool {
		let is_stale = self.background.as_ref().is_some_and(|bg| bg.snapshot.is_older_than(current));
		if !is_stale {
			return false;
		}
		let Some(background) = self.background.take() else {
			return false;
		};

		match TrackingCacheData::from_background(&background, self.tracking.as_ref()) {
			Some(tracking) => {
				tracing::debug!(
					from_version = background.snapshot.version(),
					to_version = current.version(),
					tracked = tracking.len(),
					"tagger.cache.demote"
				);
				self.tracking = Some(tracking);
			}
			None => {
				tracing::debug!(from_version = background.snapshot.version(), "tagger.cache.demote_empty");
			}
		}
		true
	}

	/// Background data for `snapshot`, created (after demoting stale data) if absent.
	///
	/// Data for an unrelated or newer snapshot is discarded.
	pub(crate) fn background_mut_for(&mut self, snapshot: &Snapshot) -> &mut BackgroundCacheData<T> {
		self.demote_stale(snapshot);
		let background = self
			.background
			.take()
			.filter(|bg| bg.snapshot == *snapshot)
			.unwrap_or_else(|| BackgroundCacheData::new(snapshot.clone()));
		self.background.insert(background)
	}
}

/// Whether `new_tags` differ from what tracking data predicted for `span`.
///
/// Without a prediction any non-empty result is news. With one, the
/// (span, tag) pairs are compared as multisets, ignoring order. Tags not
/// intersecting `span` take no part in the comparison.
pub fn did_tags_change<T: Tag>(tracking: Option<&TrackingCacheData<T>>, span: &SnapshotSpan, new_tags: &[TagSpan<T>]) -> bool {
	let fresh: Vec<&TagSpan<T>> = new_tags.iter().filter(|t| t.span.intersects_with(span)).collect();
	let Some(predicted) = tracking.and_then(|t| t.predicted(span)) else {
		return !fresh.is_empty();
	};
	if predicted.len() != fresh.len() {
		return true;
	}

	let mut counts: FxHashMap<&TagSpan<T>, isize> = FxHashMap::default();
	for tag in &predicted {
		*counts.entry(tag).or_default() += 1;
	}
	for tag in fresh {
		match counts.get_mut(tag) {
			Some(n) if *n > 0 => *n -= 1,
			_ => return true,
		}
	}
	false
}

#[cfg(test)]
mod tests;
