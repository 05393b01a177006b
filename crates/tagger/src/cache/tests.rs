use pretty_assertions::assert_eq;
use tagflow_text::{LineRange, Snapshot, SnapshotSpan, Span, TextBuffer};

use super::*;

fn tag(snapshot: &Snapshot, start: usize, len: usize, value: &'static str) -> TagSpan<&'static str> {
	TagSpan::new(SnapshotSpan::new(snapshot.clone(), Span::new(start, len)).unwrap(), value)
}

fn spans(tags: &[TagSpan<&'static str>]) -> Vec<(usize, usize, &'static str)> {
	let mut out: Vec<_> = tags.iter().map(|t| (t.span.start(), t.span.len(), t.tag)).collect();
	out.sort();
	out
}

#[test]
fn test_add_records_visited_and_dedups_straddling_tags() {
	let buffer = TextBuffer::new("aa\nbb\ncc\n");
	let snapshot = buffer.current();
	let mut bg = BackgroundCacheData::new(snapshot.clone());

	bg.add(LineRange::new(0, 1), [tag(&snapshot, 1, 4, "x")]);
	bg.add(LineRange::new(1, 1), [tag(&snapshot, 1, 4, "x"), tag(&snapshot, 3, 2, "y")]);

	assert_eq!(spans(bg.tags()), vec![(1, 4, "x"), (3, 2, "y")]);
	assert!(bg.covers(LineRange::new(0, 2)));
	assert_eq!(bg.missing(LineRange::new(0, 4)), vec![LineRange::new(2, 2)]);
}

#[test]
fn test_add_drops_tags_from_other_snapshots() {
	let mut buffer = TextBuffer::new("cat\ndog\n");
	let old = buffer.current();
	let new = buffer.insert(0, "x");
	let mut bg = BackgroundCacheData::new(new.clone());

	bg.add(LineRange::new(0, 2), [tag(&old, 0, 3, "cat"), tag(&new, 1, 3, "cat")]);

	assert_eq!(spans(bg.tags()), vec![(1, 3, "cat")]);
}

#[test]
fn test_tags_intersecting_filters_by_span() {
	let buffer = TextBuffer::new("cat\ndog\nbear");
	let snapshot = buffer.current();
	let mut bg = BackgroundCacheData::new(snapshot.clone());
	bg.add(snapshot.lines(), [tag(&snapshot, 0, 3, "cat"), tag(&snapshot, 8, 4, "bear")]);

	let query = snapshot.line_range_extent(LineRange::new(2, 1));
	let found: Vec<_> = bg.tags_intersecting(&query).map(|t| t.tag).collect();
	assert_eq!(found, vec!["bear"]);
}

#[test]
fn test_tracking_projects_across_edit() {
	let mut buffer = TextBuffer::new("cat\ndog\nbear");
	let v0 = buffer.current();
	let mut bg = BackgroundCacheData::new(v0.clone());
	bg.add(v0.lines(), [tag(&v0, 4, 3, "dog")]);
	let tracking = TrackingCacheData::from_background(&bg, None).unwrap();

	let v1 = buffer.insert(0, "xx");

	assert_eq!(spans(&tracking.project(&v1)), vec![(6, 3, "dog")]);
	assert_eq!(tracking.overarching_span_at(&v1).map(|s| s.span()), Some(Span::new(0, 14)));
}

#[test]
fn test_tracking_skips_deleted_tags() {
	let mut buffer = TextBuffer::new("cat\ndog\nbear");
	let v0 = buffer.current();
	let mut bg = BackgroundCacheData::new(v0.clone());
	bg.add(v0.lines(), [tag(&v0, 4, 3, "dog"), tag(&v0, 8, 4, "bear")]);
	let tracking = TrackingCacheData::from_background(&bg, None).unwrap();

	let v1 = buffer.delete(4, 8);

	assert_eq!(spans(&tracking.project(&v1)), vec![(4, 4, "bear")]);
}

#[test]
fn test_from_background_without_data_is_none() {
	let buffer = TextBuffer::new("cat");
	let bg = BackgroundCacheData::<&'static str>::new(buffer.current());
	assert!(TrackingCacheData::from_background(&bg, None).is_none());
}

#[test]
fn test_demotion_keeps_previous_entries_outside_new_region() {
	let mut buffer = TextBuffer::new("cat\ndog\nbear");
	let v0 = buffer.current();
	let mut bg0 = BackgroundCacheData::new(v0.clone());
	bg0.add(v0.lines(), [tag(&v0, 4, 3, "dog"), tag(&v0, 8, 4, "bear")]);
	let previous = TrackingCacheData::from_background(&bg0, None).unwrap();

	let v1 = buffer.insert(0, "x");
	let mut bg1 = BackgroundCacheData::new(v1.clone());
	bg1.add(LineRange::new(1, 1), [tag(&v1, 5, 2, "do")]);

	let merged = TrackingCacheData::from_background(&bg1, Some(&previous)).unwrap();

	assert_eq!(spans(&merged.project(&v1)), vec![(5, 2, "do"), (9, 4, "bear")]);
	assert_eq!(merged.overarching_span_at(&v1).map(|s| s.span()), Some(Span::new(0, 13)));
}

#[test]
fn test_tags_for_requires_overlap_with_tracked_region() {
	let mut buffer = TextBuffer::new("cat\ndog\nbear");
	let v0 = buffer.current();
	let mut bg = BackgroundCacheData::new(v0.clone());
	bg.add(LineRange::new(0, 1), [tag(&v0, 0, 3, "cat")]);
	let tracking = TrackingCacheData::from_background(&bg, None).unwrap();

	let v1 = buffer.insert(12, "!");
	let far = v1.line_range_extent(LineRange::new(2, 1));
	let near = v1.line_range_extent(LineRange::new(0, 1));

	assert!(tracking.tags_for(&[far]).is_empty());
	assert_eq!(spans(&tracking.tags_for(&[near])), vec![(0, 3, "cat")]);
	assert!(tracking.tags_for(&[]).is_empty());
}

#[test]
fn test_predicted_is_none_once_region_deleted() {
	let mut buffer = TextBuffer::new("cat\ndog");
	let v0 = buffer.current();
	let mut bg = BackgroundCacheData::new(v0.clone());
	bg.add(LineRange::new(0, 1), [tag(&v0, 0, 3, "cat")]);
	let tracking = TrackingCacheData::from_background(&bg, None).unwrap();

	let v1 = buffer.delete(0, 7);

	assert!(tracking.predicted(&v1.extent()).is_none());
}

#[test]
fn test_did_tags_change_without_prediction() {
	let buffer = TextBuffer::new("cat");
	let snapshot = buffer.current();
	let extent = snapshot.extent();

	assert!(!did_tags_change::<&'static str>(None, &extent, &[]));
	assert!(did_tags_change(None, &extent, &[tag(&snapshot, 0, 3, "cat")]));
}

#[test]
fn test_did_tags_change_compares_order_independently() {
	let mut buffer = TextBuffer::new("cat\ndog\nbear");
	let v0 = buffer.current();
	let mut bg = BackgroundCacheData::new(v0.clone());
	bg.add(v0.lines(), [tag(&v0, 0, 3, "cat"), tag(&v0, 4, 3, "dog")]);
	let tracking = TrackingCacheData::from_background(&bg, None).unwrap();

	let v1 = buffer.insert(12, "s");
	let extent = v1.extent();

	let same = [tag(&v1, 4, 3, "dog"), tag(&v1, 0, 3, "cat")];
	assert!(!did_tags_change(Some(&tracking), &extent, &same));

	let moved = [tag(&v1, 4, 2, "dog"), tag(&v1, 0, 3, "cat")];
	assert!(did_tags_change(Some(&tracking), &extent, &moved));

	let fewer = [tag(&v1, 0, 3, "cat")];
	assert!(did_tags_change(Some(&tracking), &extent, &fewer));

	let duplicated = [tag(&v1, 0, 3, "cat"), tag(&v1, 0, 3, "cat")];
	assert!(did_tags_change(Some(&tracking), &extent, &duplicated));
}

#[test]
fn test_tag_cache_demotes_stale_background() {
	let mut buffer = TextBuffer::new("cat\ndog");
	let v0 = buffer.current();
	let mut cache = TagCache::default();
	assert!(cache.is_empty());

	cache.background_mut_for(&v0).add(v0.lines(), [tag(&v0, 4, 3, "dog")]);
	assert!(cache.background_for(&v0).is_some());
	assert!(cache.tracking().is_none());

	let v1 = buffer.insert(0, "a");
	let bg = cache.background_mut_for(&v1);
	assert!(bg.visited().is_empty());
	assert!(cache.background_for(&v0).is_none());
	let tracking = cache.tracking().unwrap();
	assert_eq!(spans(&tracking.project(&v1)), vec![(5, 3, "dog")]);
	assert!(!cache.is_empty());
}

#[test]
fn test_tag_cache_ignores_current_background() {
	let buffer = TextBuffer::new("cat");
	let v0 = buffer.current();
	let mut cache = TagCache::default();
	cache.background_mut_for(&v0).add(v0.lines(), [tag(&v0, 0, 3, "cat")]);

	assert!(!cache.demote_stale(&v0));
	assert_eq!(cache.background().map(|bg| bg.tags().len()), Some(1));
}
