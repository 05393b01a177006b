//! Synchronous counterpart of [`Tagger`](crate::Tagger) for cheap sources.

use std::sync::Arc;

use rustc_hash::FxHashSet;
use tagflow_text::{NormalizedSnapshotSpanCollection, SnapshotSpan};
use tokio::sync::broadcast;

use crate::config::TaggerConfig;
use crate::request_span::adjust_requested_span;
use crate::source::{BasicTagSource, TagSpan};

/// Asks a [`BasicTagSource`] directly on every request. No cache, no
/// background work; the source's `Changed` event is forwarded as
/// `TagsChanged` for everything requested so far.
pub struct BasicTagger<S: BasicTagSource> {
	source: Arc<S>,
	cached_overarching_request_span: Option<SnapshotSpan>,
	source_changed: Option<broadcast::Receiver<()>>,
	tags_changed: broadcast::Sender<SnapshotSpan>,
}

impl<S: BasicTagSource> BasicTagger<S> {
	/// Creates a tagger observing `source`.
	pub fn new(source: Arc<S>, config: TaggerConfig) -> Self {
		let config = config.normalized();
		let (tags_changed, _) = broadcast::channel(config.changed_capacity);
		let source_changed = source.subscribe_changed();
		Self {
			source,
			cached_overarching_request_span: None,
			source_changed,
			tags_changed,
		}
	}

	/// Subscribes to `TagsChanged`, raised when the source reports `Changed`.
	pub fn subscribe_tags_changed(&self) -> broadcast::Receiver<SnapshotSpan> {
		self.tags_changed.subscribe()
	}

	/// Tags intersecting `spans`, each reported once.
	pub fn get_tags(&mut self, spans: &NormalizedSnapshotSpanCollection) -> Vec<TagSpan<S::Tag>> {
		self.process_pending();
		let Some(overarching) = spans.overarching() else {
			return Vec::new();
		};
		self.cached_overarching_request_span = Some(adjust_requested_span(
			self.cached_overarching_request_span.as_ref(),
			&overarching,
		));

		let mut seen = FxHashSet::default();
		spans
			.iter()
			.flat_map(|span| self.source.tags(span))
			.filter(|tag| seen.insert(tag.clone()))
			.collect()
	}

	/// Forwards pending source `Changed` events. Returns true if any arrived.
	pub fn process_pending(&mut self) -> bool {
		let Some(receiver) = self.source_changed.as_mut() else {
			return false;
		};
		let mut changed = false;
		loop {
			match receiver.try_recv() {
				Ok(()) | Err(broadcast::error::TryRecvError::Lagged(_)) => changed = true,
				Err(broadcast::error::TryRecvError::Empty) => break,
				Err(broadcast::error::TryRecvError::Closed) => {
					self.source_changed = None;
					break;
				}
			}
		}
		if changed && let Some(span) = self.cached_overarching_request_span.clone() {
			tracing::trace!(%span, "tagger.basic.tags_changed");
			let _ = self.tags_changed.send(span);
		}
		changed
	}

	/// Span reported when the source changes.
	pub fn cached_overarching_request_span(&self) -> Option<&SnapshotSpan> {
		self.cached_overarching_request_span.as_ref()
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use tagflow_text::{LineRange, Snapshot, Span, TextBuffer};

	use super::*;

	struct VowelSource {
		changed: broadcast::Sender<()>,
	}

	impl BasicTagSource for VowelSource {
		type Tag = char;

		fn tags(&self, span: &SnapshotSpan) -> Vec<TagSpan<char>> {
			span.text()
				.chars()
				.enumerate()
				.filter(|(_, c)| "aeiou".contains(*c))
				.map(|(i, c)| {
					let at = Span::new(span.start() + i, 1);
					TagSpan::new(SnapshotSpan::new(span.snapshot().clone(), at).unwrap(), c)
				})
				.collect()
		}

		fn subscribe_changed(&self) -> Option<broadcast::Receiver<()>> {
			Some(self.changed.subscribe())
		}
	}

	fn setup() -> (Arc<VowelSource>, BasicTagger<VowelSource>) {
		let (changed, _) = broadcast::channel(4);
		let source = Arc::new(VowelSource { changed });
		let tagger = BasicTagger::new(Arc::clone(&source), TaggerConfig::default());
		(source, tagger)
	}

	fn line(snapshot: &Snapshot, line: usize) -> SnapshotSpan {
		snapshot.line_range_extent(LineRange::new(line, 1))
	}

	#[test]
	fn tags_come_straight_from_the_source() {
		let (_source, mut tagger) = setup();
		let snapshot = TextBuffer::new("cat\ndog\nbear").current();
		let spans = NormalizedSnapshotSpanCollection::new(vec![line(&snapshot, 0), line(&snapshot, 2)]).unwrap();

		let tags: Vec<_> = tagger.get_tags(&spans).into_iter().map(|t| (t.span.start(), t.tag)).collect();
		assert_eq!(tags, vec![(1, 'a'), (9, 'e'), (10, 'a')]);
	}

	#[test]
	fn empty_request_returns_nothing() {
		let (_source, mut tagger) = setup();
		assert!(tagger.get_tags(&NormalizedSnapshotSpanCollection::default()).is_empty());
		assert!(tagger.cached_overarching_request_span().is_none());
	}

	#[test]
	fn source_change_is_forwarded_for_requested_span() {
		let (source, mut tagger) = setup();
		let mut events = tagger.subscribe_tags_changed();
		let snapshot = TextBuffer::new("cat\ndog\nbear").current();
		tagger.get_tags(&NormalizedSnapshotSpanCollection::from_span(line(&snapshot, 1)));

		source.changed.send(()).unwrap();
		assert!(tagger.process_pending());

		assert_eq!(events.try_recv().unwrap(), line(&snapshot, 1));
		assert!(!tagger.process_pending());
	}

	#[test]
	fn change_before_any_request_is_silent() {
		let (source, mut tagger) = setup();
		let mut events = tagger.subscribe_tags_changed();

		source.changed.send(()).unwrap();
		assert!(tagger.process_pending());
		assert!(events.try_recv().is_err());
	}
}
