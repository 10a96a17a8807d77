// Cooperative task sequencer and wake/sleep primitives
// Single core, no preemption, no heap. WFI idles the CPU between events.
//
// Tasks are callbacks bound to one bit of a 32-bit mask. ISRs arm tasks
// and raise events; the main loop drains them by priority class with
// round-robin fairness inside a class. wait_event() yields by running
// the other tasks on top of the waiting frame.

mod event;
pub mod hooks;
pub mod mask;
pub mod scheduler;
mod state;
pub mod wake;

pub use hooks::{DefaultHooks, Hooks, Warning};
pub use mask::{EventSet, IdError, MAX_TASKS, TaskId, TaskSet};
pub use scheduler::{DEFAULT_CLASSES, Sequencer};
pub use state::TaskFn;
pub use wake::{SleepOnIdle, wait_for_interrupt};
