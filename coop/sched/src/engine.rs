//! The scheduling engine: admission, cancellation, and the time-sliced work
//! loop.
//!
//! Ordering is deadline-based: the eligible task with the smallest
//! expiration time always runs next, ties broken by ascending task id.
//! Because expiration times derive from the priority timeout table, older
//! low-priority work eventually wins over fresher arrivals of the same
//! priority, and urgent deadlines preempt without a separate preemption
//! mechanism.
//!
//! The engine holds no lock while a task callback executes, so units may
//! schedule, cancel and query re-entrantly.

use log::{debug, trace};

use coop_core::sync::{Arc, Mutex};
use coop_core::{Priority, RunId, SchedResult, TaskFault, TaskId, TimeDelta, Timestamp};
use coop_trace::Profiler;

use crate::config::SchedulerConfig;
use crate::host::HostBinding;
use crate::queues::TaskQueues;
use crate::task::{SharedSlot, Task, TaskCallback, TaskHandle, TaskResult, TaskSlot, TaskStep};

/// Options accepted by [`Scheduler::schedule`].
#[derive(Debug, Default)]
pub struct ScheduleOptions {
    /// Defer eligibility by this much; negative values clamp to zero.
    pub delay: TimeDelta,
    /// Diagnostic label with no functional effect.
    pub label: Option<String>,
}

impl ScheduleOptions {
    /// Options deferring eligibility by `delay`.
    pub fn delayed(delay: TimeDelta) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    /// Attach a diagnostic label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

#[derive(Clone, Copy)]
struct CurrentTask {
    id: TaskId,
    priority: Priority,
    expiration_time: Timestamp,
}

struct EngineState {
    queues: TaskQueues,
    next_task_id: u64,
    next_run_id: u64,
    current: Option<CurrentTask>,
    priority_override: Option<Priority>,
    host_callback_scheduled: bool,
    host_timeout_scheduled: bool,
    performing_work: bool,
    pending_faults: Vec<(TaskId, TaskFault)>,
}

enum LoopStep {
    /// No live task remains in the ready queue.
    Drained,
    /// The head is not yet expired and the slice is over; defer it.
    Paused,
    /// Run this task now.
    Run {
        task: Task,
        run: RunId,
        callback: TaskCallback,
    },
}

/// The cooperative scheduling engine.
///
/// Callers share the scheduler through [`Arc`] so task callbacks can hold a
/// clone and schedule or cancel from inside the work loop. All methods take
/// `&self`; internal state sits behind a mutex that is released whenever a
/// task callback runs.
pub struct Scheduler {
    host: Arc<dyn HostBinding>,
    profiler: Arc<Profiler>,
    config: SchedulerConfig,
    state: Mutex<EngineState>,
}

impl Scheduler {
    /// Create a scheduler with the default configuration.
    pub fn new(host: Arc<dyn HostBinding>) -> Self {
        Self::build(host, SchedulerConfig::default())
    }

    /// Create a scheduler with a validated custom configuration.
    pub fn with_config(host: Arc<dyn HostBinding>, config: SchedulerConfig) -> SchedResult<Self> {
        config.validate()?;
        Ok(Self::build(host, config))
    }

    fn build(host: Arc<dyn HostBinding>, config: SchedulerConfig) -> Self {
        Self {
            host,
            profiler: Arc::new(Profiler::new()),
            config,
            state: Mutex::new(EngineState {
                queues: TaskQueues::new(),
                next_task_id: 1,
                next_run_id: 1,
                current: None,
                priority_override: None,
                host_callback_scheduled: false,
                host_timeout_scheduled: false,
                performing_work: false,
                pending_faults: Vec::new(),
            }),
        }
    }

    /// The configuration this scheduler runs with.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Admit a unit of work.
    ///
    /// A positive `options.delay` parks the task in the timer queue until
    /// its start time; otherwise it becomes eligible immediately. Either
    /// way the engine arranges exactly one pending host re-entry.
    pub fn schedule<F>(
        &self,
        priority: Priority,
        callback: F,
        options: ScheduleOptions,
    ) -> TaskHandle
    where
        F: FnOnce(bool) -> TaskResult + Send + 'static,
    {
        let now = self.host.now();
        let start_time = now + options.delay.clamp_non_negative();
        let expiration_time = start_time + self.config.timeout_for(priority);
        let label: Option<Arc<str>> = options.label.map(Arc::from);

        let mut state = self.state.lock();
        let id = TaskId::new(state.next_task_id);
        state.next_task_id += 1;
        let slot: SharedSlot = Arc::new(Mutex::new(TaskSlot::Armed(Box::new(callback))));
        let mut task = Task {
            id,
            priority,
            start_time,
            expiration_time,
            sort_index: 0,
            slot: Arc::clone(&slot),
        };

        self.profiler.mark_task_start(now, id, priority);
        debug!("{id} admitted at {priority} (start {start_time}, deadline {expiration_time})");

        if start_time > now {
            task.sort_index = start_time.as_millis();
            state.queues.timers.push(task);
            let is_earliest = state.queues.timers.peek().map(|head| head.id) == Some(id);
            if state.queues.ready.is_empty() && is_earliest {
                // This timer now bounds the next wake-up; retarget the host.
                if state.host_timeout_scheduled {
                    self.host.cancel_host_timeout();
                } else {
                    state.host_timeout_scheduled = true;
                }
                self.host.request_host_timeout(start_time - now);
            }
        } else {
            task.sort_index = expiration_time.as_millis();
            state.queues.ready.push(task);
            if !state.host_callback_scheduled && !state.performing_work {
                state.host_callback_scheduled = true;
                self.host.request_host_callback();
            }
        }

        TaskHandle::new(id, priority, label, slot)
    }

    /// Withdraw a task.
    ///
    /// Idempotent and safe at any point in the task's life, including from
    /// inside another task's callback and after completion. Physical heap
    /// removal is deferred until the entry surfaces at a queue head.
    pub fn cancel(&self, handle: &TaskHandle) {
        let was_live = {
            let mut slot = handle.slot.lock();
            if slot.is_live() {
                *slot = TaskSlot::Cancelled;
                true
            } else {
                false
            }
        };
        if was_live {
            self.profiler.mark_task_canceled(self.host.now(), handle.id());
            debug!("{} cancelled", handle.id());
        }
    }

    /// Priority of the running task, or of the enclosing
    /// [`Scheduler::run_with_priority`] region. `None` outside both.
    pub fn current_priority_level(&self) -> Option<Priority> {
        let state = self.state.lock();
        state
            .priority_override
            .or_else(|| state.current.map(|current| current.priority))
    }

    /// Execute `f` with `priority` installed as the ambient priority,
    /// restoring the previous one on exit.
    pub fn run_with_priority<R>(&self, priority: Priority, f: impl FnOnce() -> R) -> R {
        let previous = {
            let mut state = self.state.lock();
            core::mem::replace(&mut state.priority_override, Some(priority))
        };
        let result = f();
        self.state.lock().priority_override = previous;
        result
    }

    /// Whether the running unit should return control.
    ///
    /// Composes the host's slice signal with "a task more urgent than the
    /// running one has become ready", so long low-priority units yield early
    /// to fresh urgent work.
    pub fn should_yield(&self) -> bool {
        {
            let mut state = self.state.lock();
            let now = self.host.now();
            state.queues.advance(now);
            if let Some(current) = state.current {
                if let Some(head) = state.queues.peek_ready_live() {
                    if head.expiration_time < current.expiration_time {
                        return true;
                    }
                }
            }
        }
        self.host.should_yield_to_host()
    }

    /// Live tasks (non-cancelled, unfinished) across both queues.
    pub fn queue_size(&self) -> usize {
        self.profiler.counters().queue_size.max(0) as usize
    }

    /// Whether any live task is queued or parked on a timer.
    pub fn has_pending_work(&self) -> bool {
        let mut state = self.state.lock();
        state.queues.peek_ready_live().is_some() || state.queues.next_timer_start().is_some()
    }

    /// Reset the profiler log and begin recording lifecycle events.
    pub fn start_profiling(&self) {
        self.profiler.start_logging(self.config.log_capacity);
    }

    /// Halt recording and return the terminated log; `None` when profiling
    /// was never started.
    pub fn stop_profiling(&self) -> Option<Vec<i64>> {
        self.profiler.stop_logging()
    }

    /// Shared profiling surface for external observers.
    pub fn profiler(&self) -> Arc<Profiler> {
        Arc::clone(&self.profiler)
    }

    /// Host re-entry point for a pending delayed task.
    ///
    /// Advances timers, then arranges the next wake-up: an immediate
    /// re-entry when ready work surfaced, or a fresh timeout for the next
    /// parked timer.
    pub fn handle_timeout(&self) {
        let now = self.host.now();
        let mut state = self.state.lock();
        state.host_timeout_scheduled = false;
        state.queues.advance(now);
        if state.host_callback_scheduled {
            return;
        }
        if state.queues.peek_ready_live().is_some() {
            state.host_callback_scheduled = true;
            self.host.request_host_callback();
        } else if let Some(start) = state.queues.next_timer_start() {
            state.host_timeout_scheduled = true;
            self.host.request_host_timeout(start - now);
        }
    }

    /// Host re-entry point running the work loop for one time slice.
    ///
    /// `did_timeout` means the host granted no idle time: only
    /// already-expired tasks make progress and unexpired heads defer to a
    /// fresh re-entry. Returns whether live work remains; the engine has
    /// already arranged its own follow-up re-entry either way.
    pub fn flush_work(&self, did_timeout: bool) -> bool {
        let mut now = self.host.now();
        self.profiler.mark_scheduler_resumed(now);
        trace!("work loop entered at {now} (did_timeout: {did_timeout})");

        {
            let mut state = self.state.lock();
            state.host_callback_scheduled = false;
            if state.host_timeout_scheduled {
                state.host_timeout_scheduled = false;
                self.host.cancel_host_timeout();
            }
            state.performing_work = true;
            state.queues.advance(now);
        }

        let mut has_more = false;
        loop {
            let step = {
                let mut state = self.state.lock();
                self.next_step(&mut state, now, did_timeout)
            };
            let (task, run, callback) = match step {
                LoopStep::Drained => break,
                LoopStep::Paused => {
                    has_more = true;
                    break;
                }
                LoopStep::Run {
                    task,
                    run,
                    callback,
                } => (task, run, callback),
            };

            let id = task.id;
            let did_expire = task.expiration_time <= now;
            self.profiler.mark_task_run(now, id, run, task.priority);
            trace!("{id} entering {run} (expired: {did_expire})");

            let outcome = callback(did_expire);

            now = self.host.now();
            self.profiler.clear_current_task();

            let mut state = self.state.lock();
            state.current = None;
            let mut yielded = false;
            match outcome {
                Ok(TaskStep::Continue(continuation)) => {
                    let rearmed = {
                        let mut slot = task.slot.lock();
                        match &*slot {
                            TaskSlot::Running => {
                                *slot = TaskSlot::Armed(continuation);
                                true
                            }
                            // Cancelled mid-run: the continuation is dropped.
                            _ => false,
                        }
                    };
                    if rearmed {
                        self.profiler.mark_task_yield(now, id, run);
                        trace!("{id} yielded during {run}");
                        // sort_index still carries the unchanged deadline.
                        state.queues.ready.push(task);
                        yielded = true;
                    }
                }
                Ok(TaskStep::Complete) => {
                    if Self::finish_slot(&task) {
                        self.profiler.mark_task_completed(now, id);
                        trace!("{id} completed during {run}");
                    }
                }
                Err(fault) => {
                    if Self::finish_slot(&task) {
                        self.profiler.mark_task_errored(now, id);
                        debug!("{id} faulted during {run}: {fault}");
                    }
                    state.pending_faults.push((id, fault));
                }
            }
            state.queues.advance(now);
            drop(state);

            if yielded && (did_timeout || self.host.should_yield_to_host()) {
                has_more = true;
                break;
            }
        }

        let faults = {
            let mut state = self.state.lock();
            state.performing_work = false;
            if has_more {
                if !state.host_callback_scheduled {
                    state.host_callback_scheduled = true;
                    self.host.request_host_callback();
                }
            } else if let Some(start) = state.queues.next_timer_start() {
                if !state.host_timeout_scheduled {
                    state.host_timeout_scheduled = true;
                    self.host.request_host_timeout(start - now);
                }
            }
            core::mem::take(&mut state.pending_faults)
        };

        self.profiler.mark_scheduler_suspended(now);
        trace!("work loop exiting at {now} (more work: {has_more})");

        // Failures surface only after the loop has released control, so one
        // bad task cannot stall the rest of the queue.
        for (id, fault) in faults {
            self.host.report_fault(id, fault);
        }
        has_more
    }

    fn next_step(&self, state: &mut EngineState, now: Timestamp, did_timeout: bool) -> LoopStep {
        loop {
            let expiration_time = match state.queues.peek_ready_live() {
                None => return LoopStep::Drained,
                Some(head) => head.expiration_time,
            };
            if expiration_time > now && (did_timeout || self.host.should_yield_to_host()) {
                return LoopStep::Paused;
            }
            let task = match state.queues.pop_ready_live() {
                Some(task) => task,
                None => return LoopStep::Drained,
            };
            let callback = {
                let mut slot = task.slot.lock();
                match core::mem::replace(&mut *slot, TaskSlot::Running) {
                    TaskSlot::Armed(callback) => Some(callback),
                    other => {
                        *slot = other;
                        None
                    }
                }
            };
            let Some(callback) = callback else {
                // Lost a race with cancellation between peek and pop.
                continue;
            };
            let run = RunId::new(state.next_run_id);
            state.next_run_id += 1;
            state.current = Some(CurrentTask {
                id: task.id,
                priority: task.priority,
                expiration_time: task.expiration_time,
            });
            return LoopStep::Run {
                task,
                run,
                callback,
            };
        }
    }

    /// Mark the slot finished unless cancellation already terminated it.
    fn finish_slot(task: &Task) -> bool {
        let mut slot = task.slot.lock();
        match &*slot {
            TaskSlot::Running => {
                *slot = TaskSlot::Finished;
                true
            }
            _ => false,
        }
    }
}
