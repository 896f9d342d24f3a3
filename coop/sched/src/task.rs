//! Task model: callbacks, continuations, slots, and handles.

use core::fmt;

use coop_core::sync::{Arc, Mutex};
use coop_core::{Priority, TaskFault, TaskId, Timestamp};
use coop_heap::HeapOrder;

/// Callback type executed by the work loop.
///
/// The `bool` argument tells the unit whether its deadline has already
/// passed, letting urgent work choose to push past a soft deadline.
pub type TaskCallback = Box<dyn FnOnce(bool) -> TaskResult + Send>;

/// Result of one callback entry.
pub type TaskResult = Result<TaskStep, TaskFault>;

/// Outcome of one callback entry.
pub enum TaskStep {
    /// The unit is done; the task leaves the system.
    Complete,
    /// The unit pauses; the continuation runs later under the same task
    /// identity, priority and deadline.
    Continue(TaskCallback),
}

impl TaskStep {
    /// Wrap a closure as a continuation.
    pub fn continue_with<F>(callback: F) -> Self
    where
        F: FnOnce(bool) -> TaskResult + Send + 'static,
    {
        TaskStep::Continue(Box::new(callback))
    }
}

impl fmt::Debug for TaskStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStep::Complete => write!(f, "Complete"),
            TaskStep::Continue(_) => write!(f, "Continue(..)"),
        }
    }
}

/// Lifecycle of a task's callback cell.
///
/// `Armed` holds the callback (or a continuation) awaiting its next entry.
/// The first terminal transition wins: a slot that reached `Cancelled` or
/// `Finished` never changes again, which is what makes repeated or racing
/// cancellation a safe no-op and keeps lifecycle trace records
/// exactly-once per task.
pub(crate) enum TaskSlot {
    Armed(TaskCallback),
    Running,
    Cancelled,
    Finished,
}

impl TaskSlot {
    pub(crate) fn is_live(&self) -> bool {
        matches!(self, TaskSlot::Armed(_) | TaskSlot::Running)
    }
}

pub(crate) type SharedSlot = Arc<Mutex<TaskSlot>>;

/// Entry stored in the scheduler's heaps.
///
/// `sort_index` is the key actually compared: the start time while the task
/// waits in the timer queue, the expiration time once it is ready.
pub(crate) struct Task {
    pub(crate) id: TaskId,
    pub(crate) priority: Priority,
    pub(crate) start_time: Timestamp,
    pub(crate) expiration_time: Timestamp,
    pub(crate) sort_index: i64,
    pub(crate) slot: SharedSlot,
}

impl Task {
    pub(crate) fn is_live(&self) -> bool {
        self.slot.lock().is_live()
    }
}

impl HeapOrder for Task {
    fn sort_index(&self) -> i64 {
        self.sort_index
    }

    fn sequence(&self) -> u64 {
        self.id.raw()
    }
}

/// Caller-facing handle to a scheduled task.
///
/// Cloning is cheap and the handle stays valid after the task ends; using a
/// stale handle is a no-op. Cancellation goes through
/// [`Scheduler::cancel`](crate::Scheduler::cancel) so accounting and trace
/// records stay consistent.
#[derive(Clone)]
pub struct TaskHandle {
    id: TaskId,
    priority: Priority,
    label: Option<Arc<str>>,
    pub(crate) slot: SharedSlot,
}

impl TaskHandle {
    pub(crate) fn new(
        id: TaskId,
        priority: Priority,
        label: Option<Arc<str>>,
        slot: SharedSlot,
    ) -> Self {
        Self {
            id,
            priority,
            label,
            slot,
        }
    }

    /// Identity of the task, stable across continuations.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Priority the task was scheduled at.
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Diagnostic label passed at scheduling time, if any.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Whether the task still has work pending or running.
    pub fn is_live(&self) -> bool {
        self.slot.lock().is_live()
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("label", &self.label)
            .finish()
    }
}
