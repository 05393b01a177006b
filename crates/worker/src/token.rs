use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio_util::sync::CancellationToken;

/// Identifier of one background request. Later requests compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
	/// Raw numeric value.
	pub const fn get(self) -> u64 {
		self.0
	}
}

impl fmt::Display for RequestId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "req#{}", self.0)
	}
}

/// Monotonic id source for background requests.
#[derive(Debug, Default, Clone)]
pub struct RequestClock {
	next: Arc<AtomicU64>,
}

impl RequestClock {
	/// Creates a clock whose first id is 1.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the next request id.
	pub fn next_id(&self) -> RequestId {
		RequestId(self.next.fetch_add(1, Ordering::AcqRel).wrapping_add(1))
	}

	/// Mints a fresh, uncancelled token carrying the next id.
	pub fn next_token(&self) -> RequestToken {
		RequestToken::new(self.next_id(), CancellationToken::new())
	}
}

/// Request-scoped cancellation token.
///
/// Cancelling never blocks; the background side observes it at its next
/// checkpoint.
#[derive(Debug, Clone)]
pub struct RequestToken {
	id: RequestId,
	cancel: CancellationToken,
}

impl RequestToken {
	/// Creates a token for `id`.
	pub fn new(id: RequestId, cancel: CancellationToken) -> Self {
		Self { id, cancel }
	}

	/// Request this token belongs to.
	pub const fn id(&self) -> RequestId {
		self.id
	}

	/// Returns true when cancellation is requested.
	pub fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}

	/// Requests cancellation.
	pub fn cancel(&self) {
		self.cancel.cancel();
	}

	/// Future resolving when cancellation is requested.
	pub async fn cancelled(&self) {
		self.cancel.cancelled().await;
	}

	/// Underlying token, handed to code that only knows about tokio-util.
	pub fn cancellation(&self) -> &CancellationToken {
		&self.cancel
	}

}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn ids_are_monotonic_across_clones() {
		let clock = RequestClock::new();
		let other = clock.clone();
		let a = clock.next_id();
		let b = other.next_id();
		assert_eq!(a.get(), 1);
		assert!(b > a);
	}

	#[test]
	fn clones_share_cancellation() {
		let token = RequestClock::new().next_token();
		let held = token.clone();
		assert_eq!(held.id(), token.id());
		assert!(!held.is_cancelled());
		token.cancel();
		assert!(held.is_cancelled());
		assert!(held.cancellation().is_cancelled());
	}

	#[tokio::test]
	async fn cancelled_future_resolves() {
		let token = RequestClock::new().next_token();
		let waiter = token.clone();
		let task = tokio::spawn(async move { waiter.cancelled().await });
		token.cancel();
		task.await.unwrap();
	}
}
