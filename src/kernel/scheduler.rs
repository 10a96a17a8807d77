// Cooperative task sequencer: priority classes, round-robin within a
// class, one call stack.
//
// Tasks are niladic callbacks bound to a slot. set_task() marks a slot
// pending (ISR safe); run() drains eligible tasks highest class first
// and falls into the idle hooks when nothing is left. A callback runs
// to completion unless it re-enters run() itself, which is how
// wait_event() yields without a context switch.
//
// State sits in a critical_section::Mutex so a `static` instance can be
// poked from interrupt handlers; tests just build one on the stack.

use critical_section::Mutex;

use super::hooks::{Hooks, Warning};
use super::mask::{MAX_TASKS, TaskId, TaskSet};
use super::state::{State, TaskFn};

/// Default number of priority classes.
pub const DEFAULT_CLASSES: usize = 2;

pub struct Sequencer<
    H,
    const CLASSES: usize = { DEFAULT_CLASSES },
    const TASKS: usize = { MAX_TASKS },
> {
    state: Mutex<State<H, CLASSES, TASKS>>,
    hooks: H,
}

enum Step<H, const P: usize, const N: usize> {
    Dispatch {
        id: TaskId,
        callback: Option<TaskFn<H, P, N>>,
        snapshot: [TaskSet; P],
    },
    Idle,
    Done,
}

impl<H: Hooks, const P: usize, const N: usize> Sequencer<H, P, N> {
    const CONFIG_OK: () = assert!(
        N <= MAX_TASKS && P >= 1,
        "sequencer supports 1.. priority classes and at most 32 tasks"
    );

    pub const fn new(hooks: H) -> Self {
        let () = Self::CONFIG_OK;
        Self {
            state: Mutex::new(State::new()),
            hooks,
        }
    }

    #[inline]
    pub(crate) fn with<R>(&self, f: impl FnOnce(&State<H, P, N>) -> R) -> R {
        critical_section::with(|cs| f(self.state.borrow(cs)))
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    /// Reset all scheduling state and the registry. Not from an ISR.
    pub fn init(&self) {
        self.with(|s| s.reset());
    }

    pub fn deinit(&self) {
        self.with(|s| s.reset());
        log::debug!("sequencer: deinit");
    }

    // ── registry ────────────────────────────────────────────────────

    /// Re-registering a slot replaces its callback. Slots beyond `TASKS`
    /// are ignored.
    pub fn register_task(&self, id: TaskId, callback: TaskFn<H, P, N>) {
        debug_assert!(id.index() < N, "task slot beyond configured count");
        if !TaskSet::first(N).contains(id) {
            return;
        }
        if self.with(|s| s.bind(id, callback)) {
            log::debug!("sequencer: registered {}", id);
        }
    }

    pub fn is_registered(&self, id: TaskId) -> bool {
        self.with(|s| s.callback(id).is_some())
    }

    // ── activation ──────────────────────────────────────────────────

    /// Mark `id` pending in priority `class` (0 = highest). A second call
    /// before the task runs only moves it between classes.
    pub fn set_task(&self, id: TaskId, class: usize) {
        debug_assert!(class < P, "priority class out of range");
        let class = class.min(P - 1);
        self.with(|s| s.mark_pending(id, class));
    }

    /// Hide `id` from scheduling; its pending flag survives.
    pub fn pause_task(&self, id: TaskId) {
        self.with(|s| s.set_enabled(id, false));
        log::debug!("sequencer: paused {}", id);
    }

    pub fn resume_task(&self, id: TaskId) {
        self.with(|s| s.set_enabled(id, true));
        log::debug!("sequencer: resumed {}", id);
    }

    pub fn is_paused(&self, id: TaskId) -> bool {
        self.with(|s| !s.enabled().contains(id))
    }

    pub fn is_pending(&self, id: TaskId) -> bool {
        self.with(|s| s.is_pending(id))
    }

    /// pending, not paused, and inside the scope of the innermost run()
    pub fn is_schedulable(&self, id: TaskId) -> bool {
        self.with(|s| s.is_schedulable(id))
    }

    pub fn pending(&self) -> TaskSet {
        self.with(|s| s.pending())
    }

    pub fn paused(&self) -> TaskSet {
        self.with(|s| !s.enabled())
    }

    /// Task whose callback is executing, innermost first.
    pub fn current_task(&self) -> Option<TaskId> {
        self.with(|s| s.current())
    }

    // ── run loop ────────────────────────────────────────────────────

    /// Run eligible tasks within `scope` until none is left (one idle
    /// pass, then return) or the awaited event fires (return at once).
    ///
    /// Nested calls from inside a callback can only narrow the scope.
    pub fn run(&self, scope: TaskSet) {
        let (outer_scope, outer_task) = self.with(|s| (s.narrow_scope(scope), s.current()));

        loop {
            match self.next_step() {
                Step::Dispatch {
                    id,
                    callback,
                    snapshot,
                } => self.dispatch(id, callback, &snapshot),
                Step::Idle => {
                    self.idle_pass();
                    break;
                }
                Step::Done => break,
            }
        }

        self.with(|s| {
            s.restore_scope(outer_scope);
            s.set_current(outer_task);
        });
    }

    /// Application main loop.
    pub fn run_forever(&self) -> ! {
        loop {
            self.run(TaskSet::ALL);
        }
    }

    fn next_step(&self) -> Step<H, P, N> {
        self.with(|s| {
            if s.awaited_fired() {
                return Step::Done;
            }
            match s.select() {
                Some(id) => {
                    let snapshot = s.claim(id);
                    let callback = s.callback(id);
                    if callback.is_some() {
                        s.set_current(Some(id));
                    }
                    Step::Dispatch {
                        id,
                        callback,
                        snapshot,
                    }
                }
                None => Step::Idle,
            }
        })
    }

    fn dispatch(&self, id: TaskId, callback: Option<TaskFn<H, P, N>>, snapshot: &[TaskSet; P]) {
        let Some(callback) = callback else {
            self.hooks.catch_warning(Warning::InvalidTaskId {
                index: id.index() as u8,
            });
            self.with(|s| s.mark_ran(id));
            return;
        };

        log::trace!("sequencer: run {}", id);
        self.hooks.pre_task(id);
        callback(self);
        self.with(|s| {
            s.restore_round_robin(snapshot);
            s.mark_ran(id);
        });
        self.hooks.post_task(id);
    }

    fn idle_pass(&self) {
        self.with(|s| s.set_current(None));
        self.hooks.pre_idle();

        // an interrupt may have armed something since select()
        critical_section::with(|cs| {
            let s = self.state.borrow(cs);
            if s.eligible().is_empty() && !s.awaited_fired() {
                self.hooks.idle(cs);
            }
        });

        self.hooks.post_idle();
    }
}

impl<H: Hooks + Default, const P: usize, const N: usize> Default for Sequencer<H, P, N> {
    fn default() -> Self {
        Self::new(H::default())
    }
}
