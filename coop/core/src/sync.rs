//! Platform abstraction for synchronization primitives.
//!
//! Provides unified `Mutex` and `Arc` types. With the default `std` feature
//! the locks come from `parking_lot`; with `lock-free` they come from
//! `spin`, which suits hosts that must never park the driving thread. Both
//! expose the same guard-returning `lock()` API, so the rest of the
//! workspace is written against this module only.

pub use std::sync::Arc;

#[cfg(all(feature = "std", not(feature = "lock-free")))]
pub use parking_lot::{Mutex, MutexGuard};

#[cfg(feature = "lock-free")]
pub use spin::{Mutex, MutexGuard};
