//! Error types for scheduler operations.

use thiserror::Error;

/// Result type used throughout the scheduler crates.
pub type SchedResult<T> = Result<T, SchedError>;

/// Errors surfaced by the scheduler API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedError {
    /// Numeric code does not name a priority level.
    #[error("invalid priority code: {0}")]
    InvalidPriority(u8),
    /// Configuration rejected at construction time.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Failure payload produced by a task unit.
///
/// Faults are isolated to the failing task: the engine records them, drops
/// the task, and re-surfaces the payload to the host after the work loop
/// returns, so the failure stays visible without starving the queue.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct TaskFault {
    message: String,
}

impl TaskFault {
    /// Create a fault carrying a description of what went wrong.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Get the fault description.
    pub fn message(&self) -> &str {
        &self.message
    }
}
