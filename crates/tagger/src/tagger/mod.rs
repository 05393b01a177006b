//! The asynchronous tagging engine.
//!
//! [`Tagger`] answers [`Tagger::get_tags`] synchronously from whatever it
//! already knows, and feeds everything it does not know to a single
//! background job through a [`Channel`]. Results come back as posted
//! messages that the host drains with [`Tagger::process_pending`] (or awaits
//! with [`Tagger::wait_for_background`]); each delivery that changes what
//! callers would see raises a `TagsChanged` notification.
//!
//! All mutable engine state lives on the foreground. The channel is the only
//! structure shared with the background job.

use std::sync::Arc;

use rustc_hash::FxHashSet;
use tagflow_text::{LineRange, NormalizedSnapshotSpanCollection, Snapshot, SnapshotLineRange, SnapshotSpan};
use tagflow_worker::{RequestClock, RequestId};
use tokio::sync::{broadcast, mpsc};

use crate::cache::{TagCache, did_tags_change};
use crate::channel::Channel;
use crate::config::TaggerConfig;
use crate::line_ranges::NormalizedLineRangeCollection;
use crate::request::{AsyncBackgroundRequest, BackgroundMessage, Job};
use crate::request_span::adjust_requested_span;
use crate::source::{AsyncTagSource, Tag, TagSpan};

/// Tag engine over one [`AsyncTagSource`].
pub struct Tagger<S: AsyncTagSource> {
	source: Arc<S>,
	chunk_count: usize,
	clock: RequestClock,
	cache: TagCache<S::Tag>,
	request: Option<AsyncBackgroundRequest>,
	cached_overarching_request_span: Option<SnapshotSpan>,
	tx: mpsc::UnboundedSender<BackgroundMessage<S::Tag>>,
	rx: mpsc::UnboundedReceiver<BackgroundMessage<S::Tag>>,
	source_changed: Option<broadcast::Receiver<()>>,
	tags_changed: broadcast::Sender<SnapshotSpan>,
}

impl<S: AsyncTagSource> Tagger<S> {
	/// Creates an idle tagger observing `source`.
	pub fn new(source: Arc<S>, config: TaggerConfig) -> Self {
		let config = config.normalized();
		let (tx, rx) = mpsc::unbounded_channel();
		let (tags_changed, _) = broadcast::channel(config.changed_capacity);
		let source_changed = source.subscribe_changed();
		Self {
			source,
			chunk_count: config.chunk_count,
			clock: RequestClock::new(),
			cache: TagCache::default(),
			request: None,
			cached_overarching_request_span: None,
			tx,
			rx,
			source_changed,
			tags_changed,
		}
	}

	/// Subscribes to `TagsChanged`: spans whose tags differ from what was
	/// previously reported. Callers should query them again.
	pub fn subscribe_tags_changed(&self) -> broadcast::Receiver<SnapshotSpan> {
		self.tags_changed.subscribe()
	}

	/// Tags intersecting `spans`, as far as they are known right now.
	///
	/// Never blocks. Whatever is not known yet is queued for background
	/// classification, and a `TagsChanged` notification follows once it is.
	pub fn get_tags(&mut self, spans: &NormalizedSnapshotSpanCollection) -> Vec<TagSpan<S::Tag>> {
		self.poll_source_changed();

		let Some(overarching) = spans.overarching() else {
			return Vec::new();
		};
		self.cached_overarching_request_span = Some(adjust_requested_span(
			self.cached_overarching_request_span.as_ref(),
			&overarching,
		));
		let snapshot = overarching.snapshot().clone();

		let mut tags = Vec::new();
		let mut needed = Vec::new();
		for span in spans {
			match self.source.try_tags_prompt(span) {
				Some(prompt) => tags.extend(prompt),
				None => needed.push(span.clone()),
			}
		}
		if needed.is_empty() {
			return tags;
		}

		self.cache.demote_stale(&snapshot);
		let mut uncovered = NormalizedLineRangeCollection::new();
		let mut untracked = Vec::new();
		let background = self.cache.background_for(&snapshot);
		for span in &needed {
			let lines = span.line_range().line_range();
			let Some(background) = background else {
				uncovered.add(lines);
				untracked.push(span.clone());
				continue;
			};
			tags.extend(background.tags_intersecting(span).cloned());
			if background.covers(lines) {
				continue;
			}
			for missing in background.missing(lines) {
				uncovered.add(missing);
				if let Some(part) = snapshot
					.line_range_extent(missing)
					.intersection(span)
					.filter(|part| !part.is_empty() || span.is_empty())
				{
					untracked.push(part);
				}
			}
		}
		if let Some(tracking) = self.cache.tracking()
			&& !untracked.is_empty()
		{
			tags.extend(tracking.tags_for(&untracked));
		}

		if !uncovered.is_empty() {
			self.schedule_background(&snapshot, &uncovered);
		}
		dedup_tags(tags)
	}

	/// Handles every source event and background delivery already posted.
	///
	/// Returns the number of background messages handled. Never blocks.
	pub fn process_pending(&mut self) -> usize {
		self.poll_source_changed();
		let mut handled = 0;
		while let Ok(message) = self.rx.try_recv() {
			self.handle_message(message);
			handled += 1;
		}
		handled
	}

	/// Awaits and handles the next background delivery.
	///
	/// Returns false without waiting when no request is live.
	pub async fn next_event(&mut self) -> bool {
		self.poll_source_changed();
		if self.request.is_none() {
			return false;
		}
		match self.rx.recv().await {
			Some(message) => {
				self.handle_message(message);
				true
			}
			None => false,
		}
	}

	/// Handles deliveries until no background request is live.
	pub async fn wait_for_background(&mut self) {
		self.process_pending();
		while self.next_event().await {}
	}

	/// Cache contents, for diagnostics.
	pub fn tag_cache(&self) -> &TagCache<S::Tag> {
		&self.cache
	}

	/// Live background request, for diagnostics.
	pub fn background_request(&self) -> Option<&AsyncBackgroundRequest> {
		self.request.as_ref()
	}

	/// Span the tagger currently reports notifications against.
	pub fn cached_overarching_request_span(&self) -> Option<&SnapshotSpan> {
		self.cached_overarching_request_span.as_ref()
	}

	/// Lines per background chunk.
	pub fn chunk_count(&self) -> usize {
		self.chunk_count
	}

	/// Changes the chunk size for requests started from now on. Clamped to 1.
	pub fn set_chunk_count(&mut self, chunk_count: usize) {
		self.chunk_count = chunk_count.max(1);
	}

	/// Queues `uncovered` for background classification on `snapshot`.
	fn schedule_background(&mut self, snapshot: &Snapshot, uncovered: &NormalizedLineRangeCollection) {
		let visible = self.visible_work(snapshot);
		let live = self
			.request
			.as_ref()
			.filter(|request| request.snapshot() == snapshot && !request.is_cancelled());

		if let Some(request) = live {
			write_work(request.channel(), uncovered, &visible);
			return;
		}

		if let Some(stale) = self.request.take() {
			stale.cancel();
		}
		let channel = Arc::new(Channel::new());
		write_work(&channel, uncovered, &visible);
		self.request = Some(self.start_request(snapshot.clone(), channel));
	}

	fn start_request(&self, snapshot: Snapshot, channel: Arc<Channel>) -> AsyncBackgroundRequest {
		let data = Arc::new(self.source.data_for_snapshot(&snapshot));
		AsyncBackgroundRequest::start(Job {
			source: Arc::clone(&self.source),
			data,
			snapshot,
			channel,
			token: self.clock.next_token(),
			chunk_count: self.chunk_count,
			delay: self.source.delay(),
			tx: self.tx.clone(),
		})
	}

	/// Unclassified pieces of the source's visible lines on `snapshot`, in order.
	fn visible_work(&self, snapshot: &Snapshot) -> Vec<LineRange> {
		let Some(visible) = self.source.visible_line_range() else {
			return Vec::new();
		};
		if visible.snapshot() != snapshot {
			tracing::trace!(
				visible_version = visible.snapshot().version(),
				version = snapshot.version(),
				"tagger.visible_lines.other_snapshot"
			);
			return Vec::new();
		}
		let lines = visible.line_range();
		match self.cache.background_for(snapshot) {
			Some(background) => background.missing(lines),
			None if lines.is_empty() => Vec::new(),
			None => vec![lines],
		}
	}

	fn handle_message(&mut self, message: BackgroundMessage<S::Tag>) {
		match message {
			BackgroundMessage::Chunk { id, lines, tags } => self.on_chunk(id, lines, tags),
			BackgroundMessage::Completed { id } => self.on_completed(id),
		}
	}

	fn is_current(&self, id: RequestId) -> bool {
		self.request
			.as_ref()
			.is_some_and(|request| request.id() == id && !request.is_cancelled())
	}

	fn on_chunk(&mut self, id: RequestId, lines: SnapshotLineRange, tags: Vec<TagSpan<S::Tag>>) {
		if !self.is_current(id) {
			tracing::trace!(request = %id, lines = %lines.line_range(), "tagger.delivery.stale");
			return;
		}

		let extent = lines.extent_including_line_break();
		let changed = did_tags_change(self.cache.tracking(), &extent, &tags);
		tracing::trace!(
			request = %id,
			lines = %lines.line_range(),
			tags = tags.len(),
			changed,
			"tagger.delivery.chunk"
		);
		self.cache
			.background_mut_for(lines.snapshot())
			.add(lines.line_range(), tags);

		if changed {
			let span = self.notification_span(extent);
			self.raise_tags_changed(span);
		}
	}

	fn on_completed(&mut self, id: RequestId) {
		if !self.is_current(id) {
			tracing::trace!(request = %id, "tagger.delivery.stale_completion");
			return;
		}
		let Some(request) = self.request.take() else {
			return;
		};

		if request.channel().has_pending() {
			// The job exited its read loop before seeing these writes.
			tracing::debug!(
				request = %id,
				pending = request.channel().current_stack().len(),
				"tagger.request.race_recovered"
			);
			let snapshot = request.snapshot().clone();
			let channel = Arc::clone(request.channel());
			self.request = Some(self.start_request(snapshot, channel));
		} else {
			tracing::debug!(request = %id, "tagger.request.completed");
		}
	}

	/// Chunk extent, clipped to what callers asked about when they overlap.
	fn notification_span(&self, extent: SnapshotSpan) -> SnapshotSpan {
		self.cached_overarching_request_span
			.as_ref()
			.and_then(|requested| requested.intersection(&extent))
			.filter(|clipped| !clipped.is_empty())
			.unwrap_or(extent)
	}

	fn raise_tags_changed(&self, span: SnapshotSpan) {
		tracing::trace!(%span, receivers = self.tags_changed.receiver_count(), "tagger.tags_changed");
		let _ = self.tags_changed.send(span);
	}

	fn poll_source_changed(&mut self) {
		let Some(receiver) = self.source_changed.as_mut() else {
			return;
		};
		let mut changed = false;
		let mut closed = false;
		loop {
			match receiver.try_recv() {
				Ok(()) | Err(broadcast::error::TryRecvError::Lagged(_)) => changed = true,
				Err(broadcast::error::TryRecvError::Empty) => break,
				Err(broadcast::error::TryRecvError::Closed) => {
					closed = true;
					break;
				}
			}
		}
		if closed {
			tracing::debug!("tagger.source.changed_closed");
			self.source_changed = None;
		}
		if changed {
			self.on_source_changed();
		}
	}

	/// Drops everything known and tells subscribers to ask again.
	fn on_source_changed(&mut self) {
		if let Some(request) = self.request.take() {
			request.cancel();
		}
		self.cache = TagCache::default();
		tracing::debug!("tagger.source.changed");
		if let Some(span) = self.cached_overarching_request_span.clone() {
			self.raise_tags_changed(span);
		}
	}
}

impl<S: AsyncTagSource> Drop for Tagger<S> {
	fn drop(&mut self) {
		if let Some(request) = self.request.take() {
			request.cancel();
		}
	}
}

/// Pushes normal work in reverse document order so it is read top-down.
///
/// Only the first visible piece takes the visible slot; the rest go on top
/// of the normal stack so already classified lines between them are skipped.
fn write_work(channel: &Channel, uncovered: &NormalizedLineRangeCollection, visible: &[LineRange]) {
	for range in uncovered.iter().rev() {
		channel.write_normal(*range);
	}
	let Some((first, rest)) = visible.split_first() else {
		return;
	};
	for range in rest.iter().rev() {
		channel.write_normal(*range);
	}
	channel.write_visible_lines(*first);
}

/// Drops repeated (span, tag) pairs, keeping first occurrences in order.
fn dedup_tags<T: Tag>(tags: Vec<TagSpan<T>>) -> Vec<TagSpan<T>> {
	let mut seen = FxHashSet::default();
	tags.into_iter().filter(|tag| seen.insert(tag.clone())).collect()
}
