use tagflow_text::LineRange;

/// Sorted, non-touching set of line ranges.
///
/// Adding a range that overlaps, touches or bridges existing entries merges
/// them into one. Used as the "visited" set recording which lines of a
/// snapshot have been classified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedLineRangeCollection {
	ranges: Vec<LineRange>,
}

impl NormalizedLineRangeCollection {
	/// Creates an empty collection.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a collection holding `range`.
	pub fn from_range(range: LineRange) -> Self {
		let mut this = Self::new();
		this.add(range);
		this
	}

	/// Entries in ascending order.
	pub fn iter(&self) -> std::slice::Iter<'_, LineRange> {
		self.ranges.iter()
	}

	/// Number of disjoint entries.
	pub fn len(&self) -> usize {
		self.ranges.len()
	}

	/// Returns true if no line is recorded.
	pub fn is_empty(&self) -> bool {
		self.ranges.is_empty()
	}

	/// Inserts `range`, merging with every entry it touches. Empty ranges are ignored.
	pub fn add(&mut self, range: LineRange) {
		if range.is_empty() {
			return;
		}

		let mut merged = range;
		let mut out = Vec::with_capacity(self.ranges.len() + 1);
		let mut inserted = false;
		for &existing in &self.ranges {
			if !inserted && existing.touches(&merged) {
				merged = merged.union(&existing);
			} else if existing.end_line() < merged.start_line() {
				out.push(existing);
			} else {
				if !inserted {
					out.push(merged);
					inserted = true;
				}
				out.push(existing);
			}
		}
		if !inserted {
			out.push(merged);
		}
		self.ranges = out;
	}

	/// Whether `line` is recorded.
	pub fn contains_line(&self, line: usize) -> bool {
		self.entry_at_or_before(line).is_some_and(|r| r.contains_line(line))
	}

	/// Whether every line of `range` is recorded. Empty ranges are always contained.
	pub fn contains(&self, range: LineRange) -> bool {
		range.is_empty() || self.entry_at_or_before(range.start_line()).is_some_and(|r| r.contains(&range))
	}

	/// Whether any line of `range` is recorded.
	pub fn intersects(&self, range: LineRange) -> bool {
		self.ranges.iter().any(|r| r.intersects(&range))
	}

	/// Parts of `range` that are not recorded, in order.
	pub fn missing(&self, range: LineRange) -> Vec<LineRange> {
		let mut out = Vec::new();
		let end = range.end_line();
		let mut cursor = range.start_line();
		for r in &self.ranges {
			if cursor >= end || r.start_line() >= end {
				break;
			}
			if r.end_line() <= cursor {
				continue;
			}
			if r.start_line() > cursor {
				out.push(LineRange::from_bounds(cursor, r.start_line()));
			}
			cursor = cursor.max(r.end_line());
		}
		if cursor < end {
			out.push(LineRange::from_bounds(cursor, end));
		}
		out
	}

	/// Range from the first recorded line to the last.
	pub fn overarching(&self) -> Option<LineRange> {
		let first = self.ranges.first()?;
		let last = self.ranges.last()?;
		Some(LineRange::from_bounds(first.start_line(), last.end_line()))
	}

	fn entry_at_or_before(&self, line: usize) -> Option<&LineRange> {
		let idx = self.ranges.partition_point(|r| r.start_line() <= line);
		idx.checked_sub(1).map(|i| &self.ranges[i])
	}
}

impl<'a> IntoIterator for &'a NormalizedLineRangeCollection {
	type Item = &'a LineRange;
	type IntoIter = std::slice::Iter<'a, LineRange>;

	fn into_iter(self) -> Self::IntoIter {
		self.ranges.iter()
	}
}
