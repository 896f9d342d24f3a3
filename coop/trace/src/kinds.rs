//! Trace record kinds and their wire codes.

/// Kind tag of one event log tuple.
///
/// The numeric codes are the on-wire format consumed by host tooling:
/// `[kind, t, ...]` with kind-specific operands. `None` doubles as the
/// terminator marking the end of valid data in an over-allocated buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum TraceEventKind {
    /// Terminator / empty cell.
    None = 0,
    /// `[1, t, task, priority]`: task admitted by `schedule`.
    TaskStart = 1,
    /// `[2, t, task]`: task ran to completion.
    TaskComplete = 2,
    /// `[3, t, task]`: task terminated by a fault.
    TaskError = 3,
    /// `[4, t, task]`: task cancelled while still live.
    TaskCancel = 4,
    /// `[5, t, task, run]`: a (re)entry of the task's callback began.
    TaskRun = 5,
    /// `[6, t, task, run]`: the entry returned a continuation.
    TaskYield = 6,
    /// `[7, t]`: the engine returned control to the host.
    SchedulerSuspend = 7,
    /// `[8, t]`: the host re-entered the engine.
    SchedulerResume = 8,
}

impl TraceEventKind {
    /// Wire code of this kind.
    pub const fn code(self) -> i64 {
        self as i64
    }

    /// Reconstruct a kind from its wire code.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(TraceEventKind::None),
            1 => Some(TraceEventKind::TaskStart),
            2 => Some(TraceEventKind::TaskComplete),
            3 => Some(TraceEventKind::TaskError),
            4 => Some(TraceEventKind::TaskCancel),
            5 => Some(TraceEventKind::TaskRun),
            6 => Some(TraceEventKind::TaskYield),
            7 => Some(TraceEventKind::SchedulerSuspend),
            8 => Some(TraceEventKind::SchedulerResume),
            _ => None,
        }
    }

    /// Total tuple width (kind cell included) for this kind.
    pub const fn arity(self) -> usize {
        match self {
            TraceEventKind::None => 1,
            TraceEventKind::TaskComplete
            | TraceEventKind::TaskError
            | TraceEventKind::TaskCancel => 3,
            TraceEventKind::TaskStart
            | TraceEventKind::TaskRun
            | TraceEventKind::TaskYield => 4,
            TraceEventKind::SchedulerSuspend | TraceEventKind::SchedulerResume => 2,
        }
    }
}
