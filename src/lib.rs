// cooperative task sequencer for small MCUs (no RTOS, one call stack)

#![cfg_attr(not(test), no_std)]

pub mod kernel;

pub use kernel::{
    DefaultHooks, EventSet, Hooks, Sequencer, SleepOnIdle, TaskFn, TaskId, TaskSet, Warning,
};
