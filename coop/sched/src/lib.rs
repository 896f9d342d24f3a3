//! # coop-sched
//!
//! A cooperative, priority-aware task scheduler for single-threaded host
//! environments. Clients schedule units of work tagged with a priority and
//! an optional delay; the engine orders them by deadline, runs them in
//! bounded time slices, and yields control back to the host whenever the
//! slice budget is exhausted or more urgent work arrives. Units pause by
//! returning continuations that resume under the same task identity.
//!
//! ## Module Overview
//! - [`task`]   – Callbacks, continuations, task slots and handles.
//! - [`host`]   – The platform seam ([`HostBinding`]) and the deterministic
//!   [`ManualHost`] driver.
//! - [`config`] – The priority timeout table and engine tuning.
//! - [`engine`] – The [`Scheduler`] itself: admission, cancellation, and the
//!   time-sliced work loop.
//!
//! Profiling lives in the `coop-trace` crate and is re-exported here; the
//! queues build on the `coop-heap` min-heap.

pub mod config;
pub mod engine;
pub mod host;
mod queues;
pub mod task;

pub use config::{SchedulerConfig, SchedulerConfigBuilder, IMMEDIATE_TIMEOUT};
pub use engine::{ScheduleOptions, Scheduler};
pub use host::{HostBinding, ManualHost, DEFAULT_QUANTUM};
pub use task::{TaskCallback, TaskHandle, TaskResult, TaskStep};

pub use coop_core::{
    Priority, RunId, SchedError, SchedResult, TaskFault, TaskId, TimeDelta, Timestamp,
};
pub use coop_trace::{decode_events, Counters, Profiler, TraceEvent, TraceEventKind};
