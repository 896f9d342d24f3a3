//! Priority levels and their ordering guarantees.

use core::fmt;

use crate::{SchedError, SchedResult};

/// Scheduling priority of a task, ordered by increasing timeout strictness.
///
/// `Immediate` work is treated as already expired when it is scheduled,
/// while `Idle` work only runs once nothing else is eligible. The numeric
/// codes are stable: they appear in trace records and in the profiler
/// counter cells, where `0` means "no task running".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Priority {
    /// Must run as soon as the engine is re-entered; its deadline is
    /// already in the past at scheduling time.
    Immediate = 1,
    /// Work the user is actively blocked on (sub-second deadline).
    UserBlocking = 2,
    /// Default level for ordinary work.
    Normal = 3,
    /// Deferred work that may wait several seconds.
    Low = 4,
    /// Runs only when every other level has drained.
    Idle = 5,
}

impl Priority {
    /// All levels, ordered from strictest to most relaxed timeout.
    pub const ALL: [Priority; 5] = [
        Priority::Immediate,
        Priority::UserBlocking,
        Priority::Normal,
        Priority::Low,
        Priority::Idle,
    ];

    /// Get the numeric code of this priority.
    pub const fn raw(self) -> u8 {
        self as u8
    }

    /// Reconstruct a priority from its numeric code.
    pub fn from_raw(code: u8) -> SchedResult<Self> {
        match code {
            1 => Ok(Priority::Immediate),
            2 => Ok(Priority::UserBlocking),
            3 => Ok(Priority::Normal),
            4 => Ok(Priority::Low),
            5 => Ok(Priority::Idle),
            other => Err(SchedError::InvalidPriority(other)),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Immediate => write!(f, "Immediate"),
            Priority::UserBlocking => write!(f, "UserBlocking"),
            Priority::Normal => write!(f, "Normal"),
            Priority::Low => write!(f, "Low"),
            Priority::Idle => write!(f, "Idle"),
        }
    }
}
