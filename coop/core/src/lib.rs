//! # coop-core
//!
//! Core types shared by the coop scheduler crates: priority levels, the
//! millisecond time model, task identifiers, error types, and the platform
//! synchronization abstraction.

pub mod error;
pub mod ids;
pub mod priorities;
pub mod sync;
pub mod time;

pub use error::{SchedError, SchedResult, TaskFault};
pub use ids::{RunId, TaskId};
pub use priorities::Priority;
pub use time::{TimeDelta, Timestamp};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
