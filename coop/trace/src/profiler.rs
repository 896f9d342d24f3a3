//! Live profiling counters and the lifecycle event log.

use coop_core::sync::Mutex;
use coop_core::{Priority, RunId, TaskId, Timestamp};

use crate::buffer::EventBuffer;
use crate::kinds::TraceEventKind;

/// Default initial log capacity, in cells.
pub const DEFAULT_LOG_CAPACITY: usize = 1024;

/// Snapshot of the four live counter cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Counters {
    /// Numeric priority code of the running task; `0` when none is running.
    pub current_priority: i64,
    /// Id of the running task; `0` when none is running.
    pub current_task: i64,
    /// Id of the most recent run; increments on every (re)entry of any task.
    pub current_run: i64,
    /// Live tasks (non-null callback) across both queues.
    pub queue_size: i64,
}

struct ProfilerState {
    counters: Counters,
    log: Option<EventBuffer>,
    suspended: bool,
}

/// Profiling surface owned by the engine and shared with observers.
///
/// Single writer (the engine), any number of counter readers. The event log
/// records only between [`Profiler::start_logging`] and
/// [`Profiler::stop_logging`]; the counters are always live.
pub struct Profiler {
    state: Mutex<ProfilerState>,
}

impl Profiler {
    /// Create a profiler with idle counters and no active log.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ProfilerState {
                counters: Counters::default(),
                log: None,
                suspended: true,
            }),
        }
    }

    /// Reset the log and begin recording events.
    ///
    /// Any previously recorded but unretrieved events are discarded.
    pub fn start_logging(&self, capacity: usize) {
        let mut state = self.state.lock();
        state.log = Some(EventBuffer::with_capacity(capacity));
    }

    /// Halt recording and return the terminated log.
    ///
    /// Returns `None` when logging was never started; querying out of
    /// sequence is a diagnostic no-op, not an error.
    pub fn stop_logging(&self) -> Option<Vec<i64>> {
        let mut state = self.state.lock();
        state.log.take().map(EventBuffer::into_log)
    }

    /// Check whether events are currently being recorded.
    pub fn is_logging(&self) -> bool {
        self.state.lock().log.is_some()
    }

    /// Read the live counter cells.
    pub fn counters(&self) -> Counters {
        self.state.lock().counters
    }

    /// Record task admission; counts the task as live.
    pub fn mark_task_start(&self, t: Timestamp, task: TaskId, priority: Priority) {
        let mut state = self.state.lock();
        state.counters.queue_size += 1;
        record(
            &mut state,
            &[
                TraceEventKind::TaskStart.code(),
                t.as_millis(),
                task.raw() as i64,
                priority.raw() as i64,
            ],
        );
    }

    /// Record completion; the task no longer counts as live.
    pub fn mark_task_completed(&self, t: Timestamp, task: TaskId) {
        self.mark_terminal(TraceEventKind::TaskComplete, t, task);
    }

    /// Record a fault termination; the task no longer counts as live.
    pub fn mark_task_errored(&self, t: Timestamp, task: TaskId) {
        self.mark_terminal(TraceEventKind::TaskError, t, task);
    }

    /// Record cancellation; the task no longer counts as live.
    pub fn mark_task_canceled(&self, t: Timestamp, task: TaskId) {
        self.mark_terminal(TraceEventKind::TaskCancel, t, task);
    }

    /// Record a (re)entry of a task's callback and publish it as current.
    pub fn mark_task_run(&self, t: Timestamp, task: TaskId, run: RunId, priority: Priority) {
        let mut state = self.state.lock();
        state.counters.current_priority = priority.raw() as i64;
        state.counters.current_task = task.raw() as i64;
        state.counters.current_run = run.raw() as i64;
        record(
            &mut state,
            &[
                TraceEventKind::TaskRun.code(),
                t.as_millis(),
                task.raw() as i64,
                run.raw() as i64,
            ],
        );
    }

    /// Record that the current entry yielded a continuation.
    pub fn mark_task_yield(&self, t: Timestamp, task: TaskId, run: RunId) {
        let mut state = self.state.lock();
        record(
            &mut state,
            &[
                TraceEventKind::TaskYield.code(),
                t.as_millis(),
                task.raw() as i64,
                run.raw() as i64,
            ],
        );
    }

    /// Clear the current-task cells once an entry has returned.
    pub fn clear_current_task(&self) {
        let mut state = self.state.lock();
        state.counters.current_priority = 0;
        state.counters.current_task = 0;
    }

    /// Record that the engine returned control to the host.
    ///
    /// Suspend/resume marks are deduplicated so they strictly alternate.
    pub fn mark_scheduler_suspended(&self, t: Timestamp) {
        let mut state = self.state.lock();
        if !state.suspended {
            state.suspended = true;
            record(
                &mut state,
                &[TraceEventKind::SchedulerSuspend.code(), t.as_millis()],
            );
        }
    }

    /// Record that the host re-entered the engine.
    pub fn mark_scheduler_resumed(&self, t: Timestamp) {
        let mut state = self.state.lock();
        if state.suspended {
            state.suspended = false;
            record(
                &mut state,
                &[TraceEventKind::SchedulerResume.code(), t.as_millis()],
            );
        }
    }

    fn mark_terminal(&self, kind: TraceEventKind, t: Timestamp, task: TaskId) {
        let mut state = self.state.lock();
        state.counters.queue_size -= 1;
        record(
            &mut state,
            &[kind.code(), t.as_millis(), task.raw() as i64],
        );
    }
}

impl Default for Profiler {
    fn default() -> Self {
        Self::new()
    }
}

fn record(state: &mut ProfilerState, entry: &[i64]) {
    if let Some(log) = state.log.as_mut() {
        log.append(entry);
    }
}
