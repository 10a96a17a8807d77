// Scheduler bookkeeping, only ever touched inside a critical section
//
// Every field is a Cell so the whole block can sit in one
// critical_section::Mutex and be shared with interrupt handlers.
// Methods here assume the caller already holds the section.
//
// Fairness has two layers per priority class:
//   round_robin  tasks that have not run yet in this window; reset to
//                ALL once every eligible task in the class has had a go
//   clear_list   tasks run at least once since the last reset; pending
//                tasks outside it are "starving" and win ties first

use core::cell::Cell;

use super::mask::{EventSet, TaskId, TaskSet};
use super::scheduler::Sequencer;

pub type TaskFn<H, const P: usize, const N: usize> = fn(&Sequencer<H, P, N>);

pub(crate) struct State<H, const P: usize, const N: usize> {
    pending: Cell<TaskSet>,
    class_pending: [Cell<TaskSet>; P],
    round_robin: [Cell<TaskSet>; P],
    enabled: Cell<TaskSet>,
    scope: Cell<TaskSet>,
    clear_list: Cell<TaskSet>,

    events: Cell<EventSet>,
    awaited: Cell<EventSet>,

    // valid only while a callback runs
    current: Cell<Option<TaskId>>,

    registry: [Cell<Option<TaskFn<H, P, N>>>; N],
}

impl<H, const P: usize, const N: usize> State<H, P, N> {
    pub(crate) const fn new() -> Self {
        Self {
            pending: Cell::new(TaskSet::EMPTY),
            class_pending: [const { Cell::new(TaskSet::EMPTY) }; P],
            round_robin: [const { Cell::new(TaskSet::ALL) }; P],
            enabled: Cell::new(TaskSet::ALL),
            scope: Cell::new(TaskSet::ALL),
            clear_list: Cell::new(TaskSet::EMPTY),
            events: Cell::new(EventSet::EMPTY),
            awaited: Cell::new(EventSet::EMPTY),
            current: Cell::new(None),
            registry: [const { Cell::new(None) }; N],
        }
    }

    pub(crate) fn reset(&self) {
        self.pending.set(TaskSet::EMPTY);
        for class in &self.class_pending {
            class.set(TaskSet::EMPTY);
        }
        for rr in &self.round_robin {
            rr.set(TaskSet::ALL);
        }
        self.enabled.set(TaskSet::ALL);
        self.scope.set(TaskSet::ALL);
        self.clear_list.set(TaskSet::EMPTY);
        self.events.set(EventSet::EMPTY);
        self.awaited.set(EventSet::EMPTY);
        self.current.set(None);
        for slot in &self.registry {
            slot.set(None);
        }
    }

    // ── registry ────────────────────────────────────────────────────

    pub(crate) fn bind(&self, id: TaskId, callback: TaskFn<H, P, N>) -> bool {
        match self.registry.get(id.index()) {
            Some(slot) => {
                slot.set(Some(callback));
                true
            }
            None => false,
        }
    }

    pub(crate) fn callback(&self, id: TaskId) -> Option<TaskFn<H, P, N>> {
        self.registry.get(id.index()).and_then(Cell::get)
    }

    // ── pending / enable ────────────────────────────────────────────

    pub(crate) fn is_pending(&self, id: TaskId) -> bool {
        self.pending.get().contains(id)
    }

    /// Last call wins on class.
    pub(crate) fn mark_pending(&self, id: TaskId, class: usize) {
        let mut pending = self.pending.get();
        pending.insert(id);
        self.pending.set(pending);

        for (i, subset) in self.class_pending.iter().enumerate() {
            let mut set = subset.get();
            if i == class {
                set.insert(id);
            } else {
                set.remove(id);
            }
            subset.set(set);
        }
    }

    pub(crate) fn clear_pending(&self, id: TaskId) {
        let only = TaskSet::only(id);
        self.pending.set(self.pending.get() - only);
        for subset in &self.class_pending {
            subset.set(subset.get() - only);
        }
    }

    pub(crate) fn pending(&self) -> TaskSet {
        self.pending.get()
    }

    pub(crate) fn enabled(&self) -> TaskSet {
        self.enabled.get()
    }

    pub(crate) fn set_enabled(&self, id: TaskId, on: bool) {
        let mut enabled = self.enabled.get();
        if on {
            enabled.insert(id);
        } else {
            enabled.remove(id);
        }
        self.enabled.set(enabled);
    }

    pub(crate) fn is_schedulable(&self, id: TaskId) -> bool {
        self.eligible().contains(id)
    }

    /// pending ∩ enabled ∩ scope
    pub(crate) fn eligible(&self) -> TaskSet {
        self.pending.get() & self.enabled.get() & self.scope.get()
    }

    // ── scope / current ─────────────────────────────────────────────

    /// Nested runs only ever narrow. Returns the outer scope.
    pub(crate) fn narrow_scope(&self, mask: TaskSet) -> TaskSet {
        let outer = self.scope.get();
        self.scope.set(outer & mask);
        outer
    }

    pub(crate) fn restore_scope(&self, outer: TaskSet) {
        self.scope.set(outer);
    }

    pub(crate) fn current(&self) -> Option<TaskId> {
        self.current.get()
    }

    pub(crate) fn set_current(&self, id: Option<TaskId>) -> Option<TaskId> {
        self.current.replace(id)
    }

    // ── selection ───────────────────────────────────────────────────

    fn starving(&self) -> TaskSet {
        self.pending.get() - self.clear_list.get()
    }

    /// Next task to run, or None when nothing is eligible. Resets a
    /// class's round-robin window when all of its eligible tasks have
    /// already had their turn.
    pub(crate) fn select(&self) -> Option<TaskId> {
        let open = self.enabled.get() & self.scope.get();

        for (subset, rr) in self.class_pending.iter().zip(&self.round_robin) {
            let eligible = subset.get() & open;
            if eligible.is_empty() {
                continue;
            }

            if !rr.get().intersects(eligible) {
                rr.set(TaskSet::ALL);
            }

            let candidates = eligible & rr.get();
            let starving = candidates & self.starving();
            return if starving.is_empty() {
                candidates.lowest()
            } else {
                starving.lowest()
            };
        }

        None
    }

    /// Takes `id` out of every pending set and spends its round-robin
    /// turn in every class. The returned snapshot is what the outer
    /// bookkeeping looks like before the callback runs.
    pub(crate) fn claim(&self, id: TaskId) -> [TaskSet; P] {
        self.clear_pending(id);

        let only = TaskSet::only(id);
        let mut snapshot = [TaskSet::EMPTY; P];
        for (rr, snap) in self.round_robin.iter().zip(snapshot.iter_mut()) {
            let mask = rr.get() - only;
            rr.set(mask);
            *snap = mask;
        }
        snapshot
    }

    /// Whatever a callback did to the windows (nested run, window reset)
    /// may only remove turns, never hand back ones the outer level spent.
    pub(crate) fn restore_round_robin(&self, snapshot: &[TaskSet; P]) {
        for (rr, snap) in self.round_robin.iter().zip(snapshot) {
            rr.set(rr.get() & *snap);
        }
    }

    pub(crate) fn mark_ran(&self, id: TaskId) {
        let mut cleared = self.clear_list.get();
        cleared.insert(id);
        self.clear_list.set(cleared);

        if self.starving().is_empty() {
            self.clear_list.set(TaskSet::EMPTY);
        }
    }

    // ── events ──────────────────────────────────────────────────────

    pub(crate) fn raise_events(&self, mask: EventSet) {
        self.events.set(self.events.get() | mask);
    }

    pub(crate) fn clear_events(&self, mask: EventSet) {
        self.events.set(self.events.get() - mask);
    }

    pub(crate) fn events_raised(&self, mask: EventSet) -> bool {
        self.events.get().contains_all(mask)
    }

    /// Innermost wait takes over; returns the mask it displaced.
    pub(crate) fn begin_wait(&self, mask: EventSet) -> EventSet {
        self.awaited.replace(mask)
    }

    /// Edge-triggered: consumed bits are cleared.
    pub(crate) fn finish_wait(&self, mask: EventSet, outer: EventSet) {
        self.clear_events(mask);
        self.awaited.set(outer);
    }

    pub(crate) fn awaited_fired(&self) -> bool {
        let awaited = self.awaited.get();
        !awaited.is_empty() && self.events.get().contains_all(awaited)
    }

    pub(crate) fn pending_events(&self) -> EventSet {
        self.events.get() & self.awaited.get()
    }
}
