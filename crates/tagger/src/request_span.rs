use tagflow_text::{SnapshotSpan, SpanTrackingMode};

/// Folds a new request into the span the tagger has promised results for.
///
/// Same snapshot: the covering union. Different snapshot: `previous` is mapped
/// forward onto `next`'s snapshot and unioned. When that mapping fails (a
/// request against an older snapshot, another buffer, or deleted text) the
/// whole of `next`'s snapshot is used; the result only feeds change
/// notifications, so a loose superset is acceptable.
pub fn adjust_requested_span(previous: Option<&SnapshotSpan>, next: &SnapshotSpan) -> SnapshotSpan {
	let Some(previous) = previous else {
		return next.clone();
	};

	if previous.snapshot() == next.snapshot() {
		return previous.cover(next).unwrap_or_else(|| next.clone());
	}

	match previous.translate_to(next.snapshot(), SpanTrackingMode::EdgeInclusive) {
		Ok(mapped) => mapped.cover(next).unwrap_or_else(|| next.clone()),
		Err(error) => {
			tracing::trace!(%error, "tagger.request_span.fallback_to_extent");
			next.snapshot().extent()
		}
	}
}

#[cfg(test)]
mod tests {
	use tagflow_text::{Span, TextBuffer};

	use super::*;

	fn span(snapshot: &tagflow_text::Snapshot, start: usize, len: usize) -> SnapshotSpan {
		SnapshotSpan::new(snapshot.clone(), Span::new(start, len)).unwrap()
	}

	#[test]
	fn first_request_is_taken_as_is() {
		let snapshot = TextBuffer::new("cat\ndog\nbear").current();
		let next = span(&snapshot, 4, 3);
		assert_eq!(adjust_requested_span(None, &next), next);
	}

	#[test]
	fn same_snapshot_unions() {
		let snapshot = TextBuffer::new("cat\ndog\nbear").current();
		let adjusted = adjust_requested_span(Some(&span(&snapshot, 0, 2)), &span(&snapshot, 8, 2));
		assert_eq!(adjusted.span(), Span::new(0, 10));
	}

	#[test]
	fn forward_edit_maps_previous_then_unions() {
		let mut buffer = TextBuffer::new("cat\ndog\nbear");
		let v0 = buffer.current();
		let previous = span(&v0, 0, 3);
		let v1 = buffer.insert(0, "xx");
		let adjusted = adjust_requested_span(Some(&previous), &span(&v1, 10, 2));
		assert_eq!(adjusted.snapshot(), &v1);
		assert_eq!(adjusted.span(), Span::new(0, 12));
	}

	#[test]
	fn backward_request_falls_back_to_whole_snapshot() {
		let mut buffer = TextBuffer::new("cat\ndog\nbear");
		let v0 = buffer.current();
		let v1 = buffer.insert(0, "xx");
		let adjusted = adjust_requested_span(Some(&span(&v1, 0, 2)), &span(&v0, 4, 1));
		assert_eq!(adjusted, v0.extent());
	}
}
