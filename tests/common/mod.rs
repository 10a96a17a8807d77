// Recording hooks shared by the integration tests
#![allow(dead_code)]

use std::cell::{Cell, RefCell};

use critical_section::CriticalSection;
use pulp_sequencer::{EventSet, Hooks, Sequencer, TaskId, TaskSet, Warning};

pub const T0: TaskId = TaskId::new(0);
pub const T1: TaskId = TaskId::new(1);
pub const T2: TaskId = TaskId::new(2);
pub const T3: TaskId = TaskId::new(3);

pub const X: EventSet = EventSet::bit(0);
pub const Y: EventSet = EventSet::bit(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    Task(usize),
    Post(usize),
    Idle,
    Note(&'static str),
    Warn(Warning),
}

#[derive(Default)]
pub struct Trace {
    pub log: RefCell<Vec<Entry>>,
    pub evt_idles: Cell<u32>,
    pub pre_idles: Cell<u32>,
    pub post_idles: Cell<u32>,
}

impl Trace {
    pub fn note(&self, what: &'static str) {
        self.log.borrow_mut().push(Entry::Note(what));
    }

    pub fn tasks(&self) -> Vec<usize> {
        self.log
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Entry::Task(i) => Some(*i),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, id: TaskId) -> usize {
        self.tasks().iter().filter(|&&i| i == id.index()).count()
    }

    pub fn warnings(&self) -> Vec<Warning> {
        self.log
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Entry::Warn(w) => Some(*w),
                _ => None,
            })
            .collect()
    }
}

impl Hooks for Trace {
    fn idle(&self, _cs: CriticalSection<'_>) {
        self.log.borrow_mut().push(Entry::Idle);
    }

    fn pre_idle(&self) {
        self.pre_idles.set(self.pre_idles.get() + 1);
    }

    fn post_idle(&self) {
        self.post_idles.set(self.post_idles.get() + 1);
    }

    fn pre_task(&self, id: TaskId) {
        self.log.borrow_mut().push(Entry::Task(id.index()));
    }

    fn post_task(&self, id: TaskId) {
        self.log.borrow_mut().push(Entry::Post(id.index()));
    }

    fn evt_idle<const P: usize, const N: usize>(
        &self,
        seq: &Sequencer<Self, P, N>,
        waiting: TaskSet,
        _events: EventSet,
    ) {
        self.evt_idles.set(self.evt_idles.get() + 1);
        seq.run(!waiting);
    }

    fn catch_warning(&self, warning: Warning) {
        self.log.borrow_mut().push(Entry::Warn(warning));
    }
}

pub type Seq = Sequencer<Trace>;

pub fn noop(_: &Seq) {}
