//! Trade-history sync state machine.
//!
//! Provides:
//! - Pair resolution and storage bootstrap
//! - Paced, resumable pagination until caught up
//! - Backlog estimation and run reports

mod engine;
mod report;

pub use engine::*;
pub use report::*;
