//! Process-wide tunables for the run loop scheduler.
//!
//! Like [`dcc_core::timing`], these are meant to be set once before
//! [`crate::Controller::start`] and read without further synchronization.

use std::sync::OnceLock;

/// Scheduler tunables: command queue depth and packet repetition count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Capacity of the one-shot command channel before `command()` blocks.
    pub command_max_queue: usize,
    /// How many times a dequeued command or the broadcast-stop packet is
    /// repeated before moving on. DCC decoders only accept a command after
    /// two consecutive identical packets, so this must be at least 2.
    pub command_repeat: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            command_max_queue: 3,
            command_repeat: 30,
        }
    }
}

static SCHEDULER: OnceLock<SchedulerConfig> = OnceLock::new();

/// Installs the process-wide scheduler configuration. The first call wins;
/// later calls are ignored.
pub fn configure(config: SchedulerConfig) {
    let _ = SCHEDULER.set(config);
}

/// Returns the active scheduler configuration, installing the default one
/// on first use if [`configure`] was never called.
pub fn current() -> SchedulerConfig {
    *SCHEDULER.get_or_init(SchedulerConfig::default)
}
