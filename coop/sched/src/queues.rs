//! Timer and ready queues with lazy promotion and deletion.

use coop_core::Timestamp;
use coop_heap::MinHeap;

use crate::task::Task;

/// The dual queues: delayed tasks keyed by start time, eligible tasks keyed
/// by expiration time. A task lives in at most one of them at any instant.
pub(crate) struct TaskQueues {
    pub(crate) timers: MinHeap<Task>,
    pub(crate) ready: MinHeap<Task>,
}

impl TaskQueues {
    pub(crate) fn new() -> Self {
        Self {
            timers: MinHeap::new(),
            ready: MinHeap::new(),
        }
    }

    /// Move every timer whose start time has arrived into the ready queue,
    /// discarding cancelled ones on the way. Pure bookkeeping; runs before
    /// every readiness decision.
    pub(crate) fn advance(&mut self, now: Timestamp) {
        loop {
            let (live, due) = match self.timers.peek() {
                None => break,
                Some(head) => (head.is_live(), head.start_time <= now),
            };
            if !live {
                self.timers.pop();
                continue;
            }
            if !due {
                break;
            }
            if let Some(mut task) = self.timers.pop() {
                task.sort_index = task.expiration_time.as_millis();
                self.ready.push(task);
            }
        }
    }

    /// Borrow the first live ready task, popping dead heads lazily.
    pub(crate) fn peek_ready_live(&mut self) -> Option<&Task> {
        loop {
            let live = match self.ready.peek() {
                None => return None,
                Some(head) => head.is_live(),
            };
            if live {
                return self.ready.peek();
            }
            self.ready.pop();
        }
    }

    /// Remove and return the first live ready task.
    pub(crate) fn pop_ready_live(&mut self) -> Option<Task> {
        self.peek_ready_live()?;
        self.ready.pop()
    }

    /// Start time of the earliest live timer, popping dead heads lazily.
    pub(crate) fn next_timer_start(&mut self) -> Option<Timestamp> {
        loop {
            let (live, start) = match self.timers.peek() {
                None => return None,
                Some(head) => (head.is_live(), head.start_time),
            };
            if live {
                return Some(start);
            }
            self.timers.pop();
        }
    }
}
