//! Worker primitives shared by the tagging engine.
//!
//! Background work is spawned through [`spawn`] / [`spawn_blocking`], which
//! attach to the caller's tokio runtime when there is one and otherwise fall
//! back to a small process-wide runtime. Each background request carries a
//! [`RequestToken`] minted by a [`RequestClock`].

mod class;
mod spawn;
mod token;


pub use class::TaskClass;
pub use spawn::{join_error_panic_message, spawn, spawn_blocking};
pub use token::{RequestClock, RequestId, RequestToken};
pub use tokio_util::sync::CancellationToken;
