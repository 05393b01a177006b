use serde::Deserialize;

use crate::error::ConfigError;

/// Default number of lines classified per background chunk.
pub const DEFAULT_CHUNK_COUNT: usize = 100;

const DEFAULT_CHANGED_CAPACITY: usize = 64;

/// Tagger tuning knobs.
///
/// Loadable from TOML; missing keys keep their defaults:
///
/// ```toml
/// chunk_count = 250
/// changed_capacity = 128
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TaggerConfig {
	/// Lines handed to the source per background classification call.
	pub chunk_count: usize,
	/// Buffered `TagsChanged` notifications per subscriber before lagging.
	pub changed_capacity: usize,
}

impl Default for TaggerConfig {
	fn default() -> Self {
		Self {
			chunk_count: DEFAULT_CHUNK_COUNT,
			changed_capacity: DEFAULT_CHANGED_CAPACITY,
		}
	}
}

impl TaggerConfig {
	/// Parses a TOML document and normalizes the result.
	pub fn from_toml_str(src: &str) -> Result<Self, ConfigError> {
		let cfg: Self = toml::from_str(src)?;
		Ok(cfg.normalized())
	}

	/// Clamps every knob to its minimum of 1.
	pub fn normalized(self) -> Self {
		Self {
			chunk_count: self.chunk_count.max(1),
			changed_capacity: self.changed_capacity.max(1),
		}
	}
}
