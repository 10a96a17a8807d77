// Event signalling and cooperative waits
//
// Producers (tasks or ISRs) raise bits with set_event(). A task blocks
// on a mask with wait_event(): while the mask is incomplete it keeps
// calling the evt_idle hook, which by default re-enters run() for every
// other task. The waiting frame stays on the stack the whole time.
//
// Waits nest. Only the innermost mask gates the run loop; an outer wait
// whose events arrive early resumes once every inner wait has returned.

use super::hooks::Hooks;
use super::mask::{EventSet, TaskSet};
use super::scheduler::Sequencer;

impl<H: Hooks, const P: usize, const N: usize> Sequencer<H, P, N> {
    pub fn set_event(&self, events: EventSet) {
        self.with(|s| s.raise_events(events));
    }

    pub fn clear_event(&self, events: EventSet) {
        self.with(|s| s.clear_events(events));
    }

    /// Raised bits of the innermost awaited mask. Lets a custom
    /// `evt_idle` check and go to sleep inside one critical section.
    pub fn is_event_pending(&self) -> EventSet {
        self.with(|s| s.pending_events())
    }

    /// Block until every bit in `events` is raised, then consume them.
    ///
    /// Only from task context, or from the top level where nothing is
    /// running yet (every task may then run while waiting).
    pub fn wait_event(&self, events: EventSet) {
        let (outer, waiting) = self.with(|s| {
            let waiting = s.current().map_or(TaskSet::EMPTY, TaskSet::only);
            (s.begin_wait(events), waiting)
        });

        log::trace!("sequencer: wait {} ({})", events, waiting);
        while !self.with(|s| s.events_raised(events)) {
            self.hooks().evt_idle(self, waiting, events);
        }

        self.with(|s| s.finish_wait(events, outer));
    }
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;

    use super::*;
    use crate::kernel::TaskId;

    #[derive(Default)]
    struct CountingIdle {
        evt_idles: Cell<u32>,
    }

    impl Hooks for CountingIdle {
        fn evt_idle<const P: usize, const N: usize>(
            &self,
            seq: &Sequencer<Self, P, N>,
            _waiting: TaskSet,
            events: EventSet,
        ) {
            let n = self.evt_idles.get() + 1;
            self.evt_idles.set(n);
            // stand-in for an interrupt arriving every third pass
            if n % 3 == 0 {
                seq.set_event(events);
            }
        }
    }

    #[test]
    fn already_raised_event_does_not_idle() {
        let seq: Sequencer<CountingIdle> = Sequencer::default();
        seq.set_event(EventSet::bit(4));
        seq.wait_event(EventSet::bit(4));
        assert_eq!(seq.hooks().evt_idles.get(), 0);
    }

    #[test]
    fn waits_until_raised_then_consumes() {
        let seq: Sequencer<CountingIdle> = Sequencer::default();
        seq.wait_event(EventSet::from_bits(0b110));
        assert_eq!(seq.hooks().evt_idles.get(), 3);
        assert_eq!(seq.is_event_pending(), EventSet::EMPTY);

        // consumed: a second wait has to idle again
        seq.wait_event(EventSet::bit(1));
        assert_eq!(seq.hooks().evt_idles.get(), 6);
    }

    #[test]
    fn clear_event_is_idempotent() {
        let seq: Sequencer<CountingIdle> = Sequencer::default();
        seq.set_event(EventSet::from_bits(0b11));
        seq.clear_event(EventSet::bit(0));
        seq.clear_event(EventSet::bit(0));
        seq.wait_event(EventSet::bit(1));
        assert_eq!(seq.hooks().evt_idles.get(), 0);
        seq.wait_event(EventSet::bit(0));
        assert_eq!(seq.hooks().evt_idles.get(), 3);
    }

    #[test]
    fn waiting_task_is_excluded_from_its_own_yield() {
        fn waiter(seq: &Sequencer<Recorder>) {
            seq.wait_event(EventSet::bit(0));
        }

        #[derive(Default)]
        struct Recorder {
            scopes: core::cell::RefCell<Vec<TaskSet>>,
        }

        impl Hooks for Recorder {
            fn evt_idle<const P: usize, const N: usize>(
                &self,
                seq: &Sequencer<Self, P, N>,
                waiting: TaskSet,
                events: EventSet,
            ) {
                self.scopes.borrow_mut().push(waiting);
                seq.set_event(events);
            }
        }

        let seq: Sequencer<Recorder> = Sequencer::default();
        seq.register_task(TaskId::new(6), waiter);
        seq.set_task(TaskId::new(6), 1);
        seq.run(TaskSet::ALL);
        assert_eq!(
            *seq.hooks().scopes.borrow(),
            [TaskSet::only(TaskId::new(6))]
        );
    }
}
