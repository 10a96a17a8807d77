// Low-power idle: WFI from inside the idle critical section
//
// The run loop calls Hooks::idle with interrupts masked and only after
// re-checking that nothing became eligible, so sleeping here cannot
// miss a set_task()/set_event() from an ISR: the pending interrupt
// wakes the core and is serviced as soon as the section ends.

use core::sync::atomic::{AtomicU32, Ordering};

use critical_section::CriticalSection;

use super::hooks::Hooks;

#[inline]
pub fn wait_for_interrupt() {
    #[cfg(any(target_arch = "riscv32", target_arch = "arm"))]
    unsafe {
        core::arch::asm!("wfi", options(nomem, nostack));
    }

    #[cfg(not(any(target_arch = "riscv32", target_arch = "arm")))]
    {
        core::hint::spin_loop();
    }
}

/// Hooks that sleep the core whenever the sequencer runs dry.
///
/// Counts sleeps so firmware can report how often the CPU actually
/// parked (e.g. on the status line).
#[derive(Debug, Default)]
pub struct SleepOnIdle {
    sleeps: AtomicU32,
}

impl SleepOnIdle {
    pub const fn new() -> Self {
        Self {
            sleeps: AtomicU32::new(0),
        }
    }

    pub fn sleeps(&self) -> u32 {
        self.sleeps.load(Ordering::Relaxed)
    }
}

impl Hooks for SleepOnIdle {
    fn idle(&self, _cs: CriticalSection<'_>) {
        // cs: riscv32imc has no atomic RMW, the section covers the add
        let n = self.sleeps.load(Ordering::Relaxed);
        self.sleeps.store(n.wrapping_add(1), Ordering::Relaxed);
        wait_for_interrupt();
    }
}
