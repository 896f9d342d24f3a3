//! Host binding: the platform seam and a deterministic manual host.
//!
//! The engine never reads a clock or arranges its own re-entry; everything
//! timing-related flows through [`HostBinding`]. Production hosts adapt
//! whatever primitive their platform offers (a message loop, a timer queue);
//! [`ManualHost`] drives the engine deterministically for tests, demos and
//! simulations.

use coop_core::sync::{Arc, Mutex};
use coop_core::{TaskFault, TaskId, TimeDelta, Timestamp};

use crate::engine::Scheduler;

/// Platform services consumed by the engine.
///
/// Implementations must not call back into the scheduler synchronously from
/// these methods; they record the request and re-enter the engine on a
/// future turn of the host loop.
pub trait HostBinding: Send + Sync {
    /// Current reading of the host's monotonic clock.
    fn now(&self) -> Timestamp;

    /// Ask the host to re-enter the engine through
    /// [`Scheduler::flush_work`] on a future turn. The engine keeps at most
    /// one request outstanding.
    fn request_host_callback(&self);

    /// Ask the host to call [`Scheduler::handle_timeout`] after `delay`.
    fn request_host_timeout(&self, delay: TimeDelta);

    /// Withdraw a pending [`HostBinding::request_host_timeout`].
    fn cancel_host_timeout(&self);

    /// Whether the current slice's quantum has elapsed.
    fn should_yield_to_host(&self) -> bool;

    /// Receive a task failure re-surfaced after the work loop returned.
    fn report_fault(&self, task: TaskId, fault: TaskFault) {
        let _ = (task, fault);
    }
}

/// Default slice quantum granted to the work loop.
pub const DEFAULT_QUANTUM: TimeDelta = TimeDelta::from_millis(5);

/// Upper bound on host turns one `pump` call will drive, so a misbehaving
/// engine fails tests instead of spinning forever.
const PUMP_BUDGET: usize = 10_000;

struct ManualHostState {
    now: Timestamp,
    quantum: TimeDelta,
    slice_end: Timestamp,
    callback_requested: bool,
    timeout_at: Option<Timestamp>,
    faults: Vec<(TaskId, TaskFault)>,
}

/// Deterministic host for tests, demos and simulations.
///
/// The clock only moves through [`ManualHost::advance`] (tasks call it to
/// model time spent working); re-entry requests are recorded instead of
/// dispatched, and [`ManualHost::pump`] services them the way a real
/// platform loop would. Clones share state, so a copy moved into the
/// scheduler and a copy kept by the test observe the same clock.
#[derive(Clone)]
pub struct ManualHost {
    state: Arc<Mutex<ManualHostState>>,
}

impl ManualHost {
    /// Create a host with the clock at zero and the default quantum.
    pub fn new() -> Self {
        Self::with_quantum(DEFAULT_QUANTUM)
    }

    /// Create a host granting `quantum` per slice.
    pub fn with_quantum(quantum: TimeDelta) -> Self {
        Self {
            state: Arc::new(Mutex::new(ManualHostState {
                now: Timestamp::ZERO,
                quantum,
                slice_end: Timestamp::ZERO,
                callback_requested: false,
                timeout_at: None,
                faults: Vec::new(),
            })),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, delta: TimeDelta) {
        let mut state = self.state.lock();
        state.now = state.now + delta.clamp_non_negative();
    }

    /// Move the clock forward to `at`; readings never go backward.
    pub fn advance_to(&self, at: Timestamp) {
        let mut state = self.state.lock();
        if state.now < at {
            state.now = at;
        }
    }

    /// Change the slice quantum for subsequent slices.
    pub fn set_quantum(&self, quantum: TimeDelta) {
        self.state.lock().quantum = quantum;
    }

    /// Open a fresh time slice ending one quantum from now.
    pub fn begin_slice(&self) {
        let mut state = self.state.lock();
        state.slice_end = state.now + state.quantum;
    }

    /// Whether the engine has asked for a work-loop re-entry.
    pub fn callback_requested(&self) -> bool {
        self.state.lock().callback_requested
    }

    /// Deadline of the pending delayed re-entry, if one is armed.
    pub fn pending_timeout(&self) -> Option<Timestamp> {
        self.state.lock().timeout_at
    }

    /// Drain the faults re-surfaced by the engine so far.
    pub fn take_faults(&self) -> Vec<(TaskId, TaskFault)> {
        core::mem::take(&mut self.state.lock().faults)
    }

    /// Service re-entry requests until the engine goes idle.
    ///
    /// Pending callbacks are dispatched in fresh slices; pending timeouts
    /// jump the clock to their deadline first. Returns the number of host
    /// turns taken.
    pub fn pump(&self, scheduler: &Scheduler) -> usize {
        let mut turns = 0;
        for _ in 0..PUMP_BUDGET {
            let (callback, timeout) = {
                let mut state = self.state.lock();
                let callback = state.callback_requested;
                state.callback_requested = false;
                (callback, state.timeout_at)
            };
            if callback {
                self.begin_slice();
                scheduler.flush_work(false);
            } else if let Some(at) = timeout {
                {
                    let mut state = self.state.lock();
                    state.timeout_at = None;
                    if state.now < at {
                        state.now = at;
                    }
                }
                scheduler.handle_timeout();
            } else {
                break;
            }
            turns += 1;
        }
        turns
    }
}

impl Default for ManualHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HostBinding for ManualHost {
    fn now(&self) -> Timestamp {
        self.state.lock().now
    }

    fn request_host_callback(&self) {
        self.state.lock().callback_requested = true;
    }

    fn request_host_timeout(&self, delay: TimeDelta) {
        let mut state = self.state.lock();
        state.timeout_at = Some(state.now + delay.clamp_non_negative());
    }

    fn cancel_host_timeout(&self) {
        self.state.lock().timeout_at = None;
    }

    fn should_yield_to_host(&self) -> bool {
        let state = self.state.lock();
        state.now >= state.slice_end
    }

    fn report_fault(&self, task: TaskId, fault: TaskFault) {
        self.state.lock().faults.push((task, fault));
    }
}
