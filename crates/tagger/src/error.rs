//! Error types for tag sources and configuration.

use thiserror::Error;

/// Failure reported by a tag source while classifying in the background.
///
/// The engine never surfaces these to `get_tags` callers; a failed range is
/// recorded as classified with zero tags.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagSourceError {
	/// The request's cancellation token fired mid-classification.
	#[error("classification cancelled")]
	Cancelled,
	/// Any other source-specific failure.
	#[error("classification failed: {0}")]
	Failed(String),
}

impl TagSourceError {
	/// Convenience constructor for [`TagSourceError::Failed`].
	pub fn failed(msg: impl Into<String>) -> Self {
		Self::Failed(msg.into())
	}
}

/// Errors that can occur when loading a [`crate::TaggerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
	/// The TOML document did not parse or had mistyped fields.
	#[error("invalid tagger config: {0}")]
	Toml(#[from] toml::de::Error),
}
