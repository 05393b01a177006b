//! One in-flight background classification job and the messages it posts.

use std::sync::Arc;
use std::time::Duration;

use tagflow_text::{LineRange, Snapshot, SnapshotLineRange};
use tagflow_worker::{RequestId, RequestToken, TaskClass};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::channel::Channel;
use crate::line_ranges::NormalizedLineRangeCollection;
use crate::source::{AsyncTagSource, TagSpan};

/// Message posted from a background job to the foreground.
///
/// Messages of one job arrive in the order they were sent.
#[derive(Debug)]
pub(crate) enum BackgroundMessage<T> {
	/// One classified chunk. `lines` are now visited, even when the
	/// source failed and `tags` is empty.
	Chunk {
		id: RequestId,
		lines: SnapshotLineRange,
		tags: Vec<TagSpan<T>>,
	},
	/// The job left its read loop, drained or cancelled.
	Completed { id: RequestId },
}

/// Bookkeeping for the live background job of a tagger.
#[derive(Debug)]
pub struct AsyncBackgroundRequest {
	snapshot: Snapshot,
	channel: Arc<Channel>,
	token: RequestToken,
	task: JoinHandle<()>,
}

impl AsyncBackgroundRequest {
	/// Spawns a job for `job.snapshot` reading from `job.channel`.
	pub(crate) fn start<S: AsyncTagSource>(job: Job<S>) -> Self {
		let snapshot = job.snapshot.clone();
		let channel = Arc::clone(&job.channel);
		let token = job.token.clone();
		tracing::debug!(
			request = %token.id(),
			version = snapshot.version(),
			pending = channel.current_stack().len(),
			"tagger.request.start"
		);
		let task = tagflow_worker::spawn(TaskClass::Background, token.id(), job.run());
		Self {
			snapshot,
			channel,
			token,
			task,
		}
	}

	/// Request id; deliveries carrying any other id are stale.
	pub fn id(&self) -> RequestId {
		self.token.id()
	}

	/// Snapshot the job classifies.
	pub fn snapshot(&self) -> &Snapshot {
		&self.snapshot
	}

	/// Work queue feeding the job.
	pub fn channel(&self) -> &Arc<Channel> {
		&self.channel
	}

	/// Signals the job to stop at its next chunk boundary. Never blocks.
	pub fn cancel(&self) {
		if !self.token.is_cancelled() {
			tracing::debug!(request = %self.token.id(), "tagger.request.cancel");
			self.token.cancel();
		}
	}

	/// Returns true once cancellation was requested.
	pub fn is_cancelled(&self) -> bool {
		self.token.is_cancelled()
	}

	/// Returns true once the job task has exited.
	pub fn is_finished(&self) -> bool {
		self.task.is_finished()
	}
}

/// Everything one background job needs, captured on the foreground.
pub(crate) struct Job<S: AsyncTagSource> {
	pub source: Arc<S>,
	pub data: Arc<S::Data>,
	pub snapshot: Snapshot,
	pub channel: Arc<Channel>,
	pub token: RequestToken,
	pub chunk_count: usize,
	pub delay: Option<Duration>,
	pub tx: mpsc::UnboundedSender<BackgroundMessage<S::Tag>>,
}

/// Posts `Completed` when the job exits, however it exits.
struct CompletionGuard<T> {
	id: RequestId,
	tx: mpsc::UnboundedSender<BackgroundMessage<T>>,
}

impl<T> Drop for CompletionGuard<T> {
	fn drop(&mut self) {
		let _ = self.tx.send(BackgroundMessage::Completed { id: self.id });
	}
}

impl<S: AsyncTagSource> Job<S> {
	async fn run(self) {
		let id = self.token.id();
		let _completion = CompletionGuard {
			id,
			tx: self.tx.clone(),
		};

		if let Some(delay) = self.delay.filter(|d| !d.is_zero()) {
			tokio::select! {
				biased;
				_ = self.token.cancelled() => {
					tracing::debug!(request = %id, "tagger.job.cancelled_during_delay");
					return;
				}
				_ = tokio::time::sleep(delay) => {}
			}
		}

		let lines = self.snapshot.lines();
		let mut visited = NormalizedLineRangeCollection::new();
		while !self.token.is_cancelled() {
			let Some(range) = self.channel.read() else {
				break;
			};
			let Some(range) = range.intersection(&lines) else {
				continue;
			};

			for missing in visited.missing(range) {
				for chunk in chunks(missing, self.chunk_count) {
					if self.token.is_cancelled() {
						tracing::debug!(request = %id, "tagger.job.cancelled");
						return;
					}
					let tags = self.classify(chunk).await;
					if self.token.is_cancelled() {
						return;
					}
					visited.add(chunk);
					let message = BackgroundMessage::Chunk {
						id,
						lines: SnapshotLineRange::new(self.snapshot.clone(), chunk),
						tags,
					};
					if self.tx.send(message).is_err() {
						tracing::debug!(request = %id, "tagger.job.receiver_gone");
						return;
					}
				}
			}
		}
		tracing::trace!(request = %id, visited = visited.len(), "tagger.job.drained");
	}

	/// Classifies one chunk on the blocking pool. Failures become zero tags.
	async fn classify(&self, chunk: LineRange) -> Vec<TagSpan<S::Tag>> {
		let span = self.snapshot.line_range_extent(chunk);
		let source = Arc::clone(&self.source);
		let data = Arc::clone(&self.data);
		let cancel = self.token.cancellation().clone();
		let task = tagflow_worker::spawn_blocking(TaskClass::CpuBlocking, self.token.id(), move || {
			source.tags_in_background(&data, &span, &cancel)
		});

		let joined = tokio::select! {
			biased;
			joined = task => joined,
			_ = self.token.cancelled() => {
				tracing::debug!(request = %self.token.id(), %chunk, "tagger.job.chunk_abandoned");
				return Vec::new();
			}
		};

		match joined {
			Ok(Ok(tags)) => tags,
			Ok(Err(error)) => {
				tracing::warn!(request = %self.token.id(), %chunk, %error, "tagger.job.source_failed");
				Vec::new()
			}
			Err(error) => {
				let panic = tagflow_worker::join_error_panic_message(error);
				tracing::warn!(request = %self.token.id(), %chunk, panic = ?panic, "tagger.job.source_panicked");
				Vec::new()
			}
		}
	}
}

/// Splits `range` into consecutive pieces of at most `chunk_count` lines.
pub(crate) fn chunks(range: LineRange, chunk_count: usize) -> impl Iterator<Item = LineRange> {
	let size = chunk_count.max(1);
	let end = range.end_line();
	(range.start_line()..end)
		.step_by(size)
		.map(move |start| LineRange::from_bounds(start, (start + size).min(end)))
}
