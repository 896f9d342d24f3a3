//! # coop-trace
//!
//! Profiling subsystem for the coop scheduler.
//!
//! Two surfaces, both owned by the engine and shared with observers:
//!
//! - A growable, append-only **event log** recording task lifecycle events
//!   and scheduler suspend/resume marks as fixed-arity integer tuples.
//!   Capacity doubles on overflow; previously written cells are never moved
//!   relative to each other, compacted, or reinterpreted.
//! - Four **live counter cells** (current priority, current task, current
//!   run, queue size) an external observer may read at any time without
//!   waiting for a log flush.
//!
//! Logging is explicitly started and stopped; the counters are always live.

mod buffer;
mod events;
mod kinds;
mod profiler;

pub use buffer::EventBuffer;
pub use events::{decode_events, TraceEvent};
pub use kinds::TraceEventKind;
pub use profiler::{Counters, Profiler, DEFAULT_LOG_CAPACITY};
