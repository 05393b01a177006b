use ropey::Rope;

/// Which side of an insertion a mapped position lands on.
///
/// Only matters when the position sits exactly at an insertion point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
	/// Position stays before text inserted at the same location.
	Left,
	/// Position moves after text inserted at the same location.
	Right,
}

/// Inserted text with its character length cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insertion {
	text: String,
	char_len: usize,
}

impl Insertion {
	fn new(text: String) -> Self {
		let char_len = text.chars().count();
		Self { text, char_len }
	}

	/// Returns the inserted text.
	#[inline]
	pub fn text(&self) -> &str {
		&self.text
	}

	/// Returns the cached character length.
	#[inline]
	pub fn char_len(&self) -> usize {
		self.char_len
	}
}

/// A single operation in a [`ChangeSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
	/// Keep the next N characters of the source.
	Retain(usize),
	/// Drop the next N characters of the source.
	Delete(usize),
	/// Insert text at the current position.
	Insert(Insertion),
}

/// Retain/delete/insert delta taking one document version to the next.
///
/// Positions are measured in characters. The buffer history stores one
/// changeset per version step, and forward tracking replays them through
/// [`ChangeSet::map_pos`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ChangeSet {
	changes: Vec<Operation>,
	len: usize,
	len_after: usize,
}

impl ChangeSet {
	/// Creates an empty changeset.
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds the changeset replacing `[start, end)` of a `len`-char document.
	pub fn replace(len: usize, start: usize, end: usize, text: &str) -> Self {
		debug_assert!(start <= end && end <= len);
		let mut cs = Self::new();
		cs.retain(start);
		cs.delete(end - start);
		cs.insert(text.to_string());
		cs.retain(len - end);
		cs
	}

	/// Length of the source document.
	pub fn len(&self) -> usize {
		self.len
	}

	/// Length of the document after applying the changes.
	pub fn len_after(&self) -> usize {
		self.len_after
	}

	/// Returns true if this changeset contains no operations.
	pub fn is_empty(&self) -> bool {
		self.changes.is_empty()
	}

	/// Returns all operations in order.
	pub fn changes(&self) -> &[Operation] {
		&self.changes
	}

	/// Keeps `n` characters. Consecutive retains merge.
	pub fn retain(&mut self, n: usize) {
		if n == 0 {
			return;
		}

		self.len += n;
		self.len_after += n;

		if let Some(Operation::Retain(count)) = self.changes.last_mut() {
			*count += n;
		} else {
			self.changes.push(Operation::Retain(n));
		}
	}

	/// Deletes `n` characters. Consecutive deletes merge.
	pub fn delete(&mut self, n: usize) {
		if n == 0 {
			return;
		}

		self.len += n;

		if let Some(Operation::Delete(count)) = self.changes.last_mut() {
			*count += n;
		} else {
			self.changes.push(Operation::Delete(n));
		}
	}

	/// Inserts `text` at the current position.
	///
	/// Inserts are kept ahead of an adjacent delete so that `map_pos` sees
	/// the insertion point before the deleted range.
	pub fn insert(&mut self, text: String) {
		if text.is_empty() {
			return;
		}

		let ins = Insertion::new(text);
		self.len_after += ins.char_len;

		match self.changes.as_mut_slice() {
			[.., Operation::Insert(prev)] | [.., Operation::Insert(prev), Operation::Delete(_)] => {
				prev.text.push_str(&ins.text);
				prev.char_len += ins.char_len;
			}
			[.., last @ Operation::Delete(_)] => {
				let del = std::mem::replace(last, Operation::Insert(ins));
				self.changes.push(del);
			}
			_ => {
				self.changes.push(Operation::Insert(ins));
			}
		}
	}

	/// Applies this changeset to `doc` in place.
	pub fn apply(&self, doc: &mut Rope) {
		let mut pos = 0;
		for op in &self.changes {
			match op {
				Operation::Retain(n) => {
					pos += n;
				}
				Operation::Delete(n) => {
					doc.remove(pos..pos + n);
				}
				Operation::Insert(ins) => {
					doc.insert(pos, &ins.text);
					pos += ins.char_len;
				}
			}
		}
	}

	/// Maps a position in the source document onto the changed document.
	///
	/// Positions inside a deleted range collapse to the deletion point.
	pub fn map_pos(&self, pos: usize, bias: Bias) -> usize {
		let mut old_pos = 0;
		let mut new_pos = 0;

		for op in &self.changes {
			if old_pos > pos {
				break;
			}

			match op {
				Operation::Retain(n) => {
					if old_pos + n > pos {
						return new_pos + (pos - old_pos);
					}
					old_pos += n;
					new_pos += n;
				}
				Operation::Delete(n) => {
					if old_pos + n > pos {
						return new_pos;
					}
					old_pos += n;
				}
				Operation::Insert(ins) => {
					if !(old_pos == pos && bias == Bias::Left) {
						new_pos += ins.char_len;
					}
				}
			}
		}

		new_pos + (pos - old_pos)
	}
}
