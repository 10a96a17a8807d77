// Override points around dispatch and idle
//
// None of these carry state of their own. Defaults: idle spins,
// pre/post hooks do nothing, evt_idle re-enters the run loop for
// every other task, warnings go to the log.

use core::fmt;

use critical_section::CriticalSection;

use super::mask::{EventSet, TaskId, TaskSet};
use super::scheduler::Sequencer;

/// Scheduling anomalies. Reported, then skipped; never fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Warning {
    /// Selected slot is beyond the configured task count or has no callback
    InvalidTaskId { index: u8 },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::InvalidTaskId { index } => {
                write!(f, "invalid task id {} (unregistered or out of range)", index)
            }
        }
    }
}

pub trait Hooks: Sized {
    /// Low-power entry. Runs inside a critical section and only when
    /// nothing became eligible since `pre_idle`; an interrupt pending
    /// here fires once the section is left.
    fn idle(&self, _cs: CriticalSection<'_>) {}

    /// Always paired with `post_idle`, even when `idle` is skipped.
    fn pre_idle(&self) {}

    fn post_idle(&self) {}

    fn pre_task(&self, _id: TaskId) {}

    fn post_task(&self, _id: TaskId) {}

    /// Called repeatedly while `wait_event` is blocked on `events`.
    /// `waiting` is the caller's own task bit (empty at top level).
    ///
    /// Custom versions that want to sleep should test
    /// `seq.is_event_pending()` and enter low power inside the same
    /// critical section, otherwise an event raised between the check
    /// and the sleep is missed until the next interrupt.
    fn evt_idle<const P: usize, const N: usize>(
        &self,
        seq: &Sequencer<Self, P, N>,
        waiting: TaskSet,
        _events: EventSet,
    ) {
        seq.run(!waiting);
    }

    fn catch_warning(&self, warning: Warning) {
        log::warn!("sequencer: {}", warning);
    }
}

/// All defaults: spin when idle, log warnings.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHooks;

impl Hooks for DefaultHooks {}
