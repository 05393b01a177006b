//! Asynchronous tag computation over versioned text.
//!
//! A [`Tagger`] sits between a host that repeatedly asks "which tags lie in
//! these spans?" and an [`AsyncTagSource`] whose classification is too slow
//! to run on the foreground. Requests are answered immediately from a prompt
//! path, a per-snapshot background cache, or tags tracked forward from an
//! earlier snapshot; everything else is queued for a single background job.
//!
//! ```text
//! get_tags ──► prompt? ──► background cache ──► tracking cache
//!                                  │ uncovered lines
//!                                  ▼
//!                      Channel (visible lines first, then LIFO)
//!                                  │
//!                         background job, chunked
//!                                  │ posted messages
//!                                  ▼
//!      process_pending ──► merge ──► did_tags_change? ──► TagsChanged
//! ```

mod basic;
mod cache;
mod channel;
mod config;
mod error;
mod line_ranges;
mod request;
mod request_span;
mod source;
mod tagger;

pub use basic::BasicTagger;
pub use cache::{BackgroundCacheData, TagCache, TrackingCacheData, did_tags_change};
pub use channel::Channel;
pub use config::{DEFAULT_CHUNK_COUNT, TaggerConfig};
pub use error::{ConfigError, TagSourceError};
pub use line_ranges::NormalizedLineRangeCollection;
pub use request::AsyncBackgroundRequest;
pub use request_span::adjust_requested_span;
pub use source::{AsyncTagSource, BasicTagSource, Tag, TagSpan};
pub use tagger::Tagger;
