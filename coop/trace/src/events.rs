//! Decoded trace events for host tooling.

use coop_core::{Priority, RunId, TaskId, Timestamp};

use crate::kinds::TraceEventKind;

/// One decoded event log tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TraceEvent {
    /// Task admitted by `schedule`.
    TaskStart {
        time: Timestamp,
        task: TaskId,
        priority: Priority,
    },
    /// Task ran to completion.
    TaskComplete { time: Timestamp, task: TaskId },
    /// Task terminated by a fault.
    TaskError { time: Timestamp, task: TaskId },
    /// Task cancelled while still live.
    TaskCancel { time: Timestamp, task: TaskId },
    /// A (re)entry of the task's callback began.
    TaskRun {
        time: Timestamp,
        task: TaskId,
        run: RunId,
    },
    /// The entry returned a continuation.
    TaskYield {
        time: Timestamp,
        task: TaskId,
        run: RunId,
    },
    /// The engine returned control to the host.
    SchedulerSuspend { time: Timestamp },
    /// The host re-entered the engine.
    SchedulerResume { time: Timestamp },
}

impl TraceEvent {
    /// The task this event concerns, if any.
    pub fn task(&self) -> Option<TaskId> {
        match *self {
            TraceEvent::TaskStart { task, .. }
            | TraceEvent::TaskComplete { task, .. }
            | TraceEvent::TaskError { task, .. }
            | TraceEvent::TaskCancel { task, .. }
            | TraceEvent::TaskRun { task, .. }
            | TraceEvent::TaskYield { task, .. } => Some(task),
            TraceEvent::SchedulerSuspend { .. } | TraceEvent::SchedulerResume { .. } => None,
        }
    }

    /// Kind tag of this event.
    pub fn kind(&self) -> TraceEventKind {
        match self {
            TraceEvent::TaskStart { .. } => TraceEventKind::TaskStart,
            TraceEvent::TaskComplete { .. } => TraceEventKind::TaskComplete,
            TraceEvent::TaskError { .. } => TraceEventKind::TaskError,
            TraceEvent::TaskCancel { .. } => TraceEventKind::TaskCancel,
            TraceEvent::TaskRun { .. } => TraceEventKind::TaskRun,
            TraceEvent::TaskYield { .. } => TraceEventKind::TaskYield,
            TraceEvent::SchedulerSuspend { .. } => TraceEventKind::SchedulerSuspend,
            TraceEvent::SchedulerResume { .. } => TraceEventKind::SchedulerResume,
        }
    }
}

/// Decode a raw event log into typed events.
///
/// Decoding stops at the terminator cell, at the end of the slice, or at the
/// first malformed tuple; everything decoded up to that point is returned.
pub fn decode_events(cells: &[i64]) -> Vec<TraceEvent> {
    let mut events = Vec::new();
    let mut pos = 0;

    while pos < cells.len() {
        let kind = match TraceEventKind::from_code(cells[pos]) {
            Some(TraceEventKind::None) | None => break,
            Some(kind) => kind,
        };
        let end = pos + kind.arity();
        if end > cells.len() {
            break;
        }
        let tuple = &cells[pos..end];
        let time = Timestamp::from_millis(tuple[1]);

        let event = match kind {
            TraceEventKind::TaskStart => {
                let priority = match Priority::from_raw(tuple[3] as u8) {
                    Ok(priority) => priority,
                    Err(_) => break,
                };
                TraceEvent::TaskStart {
                    time,
                    task: TaskId::new(tuple[2] as u64),
                    priority,
                }
            }
            TraceEventKind::TaskComplete => TraceEvent::TaskComplete {
                time,
                task: TaskId::new(tuple[2] as u64),
            },
            TraceEventKind::TaskError => TraceEvent::TaskError {
                time,
                task: TaskId::new(tuple[2] as u64),
            },
            TraceEventKind::TaskCancel => TraceEvent::TaskCancel {
                time,
                task: TaskId::new(tuple[2] as u64),
            },
            TraceEventKind::TaskRun => TraceEvent::TaskRun {
                time,
                task: TaskId::new(tuple[2] as u64),
                run: RunId::new(tuple[3] as u64),
            },
            TraceEventKind::TaskYield => TraceEvent::TaskYield {
                time,
                task: TaskId::new(tuple[2] as u64),
                run: RunId::new(tuple[3] as u64),
            },
            TraceEventKind::SchedulerSuspend => TraceEvent::SchedulerSuspend { time },
            TraceEventKind::SchedulerResume => TraceEvent::SchedulerResume { time },
            TraceEventKind::None => unreachable!(),
        };
        events.push(event);
        pos = end;
    }

    events
}
