//! Scheduler configuration.

use coop_core::{Priority, SchedError, SchedResult, TimeDelta};
use coop_trace::DEFAULT_LOG_CAPACITY;

/// Timeout applied to Immediate work: one millisecond in the past, so the
/// task is already expired the instant it is scheduled.
pub const IMMEDIATE_TIMEOUT: TimeDelta = TimeDelta::from_millis(-1);

/// Tunable constants for a scheduler instance.
///
/// Defaults mirror the reference values. [`SchedulerConfig::validate`]
/// enforces the ordering invariant Immediate < UserBlocking < Normal < Low <
/// Idle; the magnitudes themselves are the caller's choice.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SchedulerConfig {
    /// Deadline distance for `UserBlocking` tasks.
    pub user_blocking_timeout: TimeDelta,
    /// Deadline distance for `Normal` tasks.
    pub normal_timeout: TimeDelta,
    /// Deadline distance for `Low` tasks.
    pub low_timeout: TimeDelta,
    /// Deadline distance for `Idle` tasks; effectively "after everything".
    pub idle_timeout: TimeDelta,
    /// Initial profiler log capacity, in cells.
    pub log_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            user_blocking_timeout: TimeDelta::from_millis(250),
            normal_timeout: TimeDelta::from_millis(5_000),
            low_timeout: TimeDelta::from_millis(10_000),
            idle_timeout: TimeDelta::from_millis(1_073_741_823),
            log_capacity: DEFAULT_LOG_CAPACITY,
        }
    }
}

impl SchedulerConfig {
    /// Create a configuration builder seeded with the defaults.
    pub fn builder() -> SchedulerConfigBuilder {
        SchedulerConfigBuilder::default()
    }

    /// Deadline distance for tasks of the given priority.
    pub fn timeout_for(&self, priority: Priority) -> TimeDelta {
        match priority {
            Priority::Immediate => IMMEDIATE_TIMEOUT,
            Priority::UserBlocking => self.user_blocking_timeout,
            Priority::Normal => self.normal_timeout,
            Priority::Low => self.low_timeout,
            Priority::Idle => self.idle_timeout,
        }
    }

    /// Check the timeout table ordering and sizing.
    pub fn validate(&self) -> SchedResult<()> {
        let ordered = IMMEDIATE_TIMEOUT < self.user_blocking_timeout
            && self.user_blocking_timeout < self.normal_timeout
            && self.normal_timeout < self.low_timeout
            && self.low_timeout < self.idle_timeout;
        if !ordered {
            return Err(SchedError::InvalidConfig(
                "priority timeouts must be strictly increasing",
            ));
        }
        if self.log_capacity == 0 {
            return Err(SchedError::InvalidConfig(
                "profiler log capacity must be non-zero",
            ));
        }
        Ok(())
    }
}

/// Builder for ergonomic configuration construction.
#[derive(Debug, Clone, Default)]
pub struct SchedulerConfigBuilder {
    config: SchedulerConfig,
}

impl SchedulerConfigBuilder {
    /// Set the `UserBlocking` timeout.
    pub fn user_blocking_timeout(mut self, timeout: TimeDelta) -> Self {
        self.config.user_blocking_timeout = timeout;
        self
    }

    /// Set the `Normal` timeout.
    pub fn normal_timeout(mut self, timeout: TimeDelta) -> Self {
        self.config.normal_timeout = timeout;
        self
    }

    /// Set the `Low` timeout.
    pub fn low_timeout(mut self, timeout: TimeDelta) -> Self {
        self.config.low_timeout = timeout;
        self
    }

    /// Set the `Idle` timeout.
    pub fn idle_timeout(mut self, timeout: TimeDelta) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    /// Set the initial profiler log capacity.
    pub fn log_capacity(mut self, cells: usize) -> Self {
        self.config.log_capacity = cells;
        self
    }

    /// Build the configuration (unvalidated; the scheduler validates).
    pub fn build(self) -> SchedulerConfig {
        self.config
    }
}
