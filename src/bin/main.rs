// demo firmware: sequencer on the XTEink X4 (ESP32-C3)
//
// TIMG0 ticks every 10ms. The ISR raises TICK and, once a second, arms
// the housekeeping task. The sampler (class 0) waits for each tick;
// while it waits, the class 1 tasks run on top of its frame and the
// core sleeps in WFI whenever the sequencer runs dry.

#![no_std]
#![no_main]

use core::cell::{Cell, RefCell};

use critical_section::Mutex;
use esp_backtrace as _;
use esp_hal::clock::CpuClock;
use esp_hal::time::Duration;
use esp_hal::timer::PeriodicTimer;
use esp_hal::timer::timg::TimerGroup;
use log::info;

use pulp_sequencer::{EventSet, Sequencer, SleepOnIdle, TaskId};

esp_bootloader_esp_idf::esp_app_desc!();

const TICK_MS: u64 = 10;
const TICKS_PER_SEC: u32 = 100;
const REPORT_EVERY: u32 = 500; // samples

const TICK: EventSet = EventSet::bit(0);

const SAMPLE: TaskId = TaskId::new(0);
const REPORT: TaskId = TaskId::new(1);
const HOUSEKEEPING: TaskId = TaskId::new(2);

const HIGH: usize = 0;
const LOW: usize = 1;

static SEQ: Sequencer<SleepOnIdle> = Sequencer::new(SleepOnIdle::new());

static TIMER0: Mutex<RefCell<Option<PeriodicTimer<'static, esp_hal::Blocking>>>> =
    Mutex::new(RefCell::new(None));

// cs: riscv32imc has no atomic add
static UPTIME_TICKS: Mutex<Cell<u32>> = Mutex::new(Cell::new(0));
static SAMPLES: Mutex<Cell<u32>> = Mutex::new(Cell::new(0));

#[esp_hal::handler(priority = esp_hal::interrupt::Priority::Priority1)]
fn timer0_handler() {
    let ticks = critical_section::with(|cs| {
        if let Some(timer) = TIMER0.borrow_ref_mut(cs).as_mut() {
            timer.clear_interrupt();
        }
        let ticks = UPTIME_TICKS.borrow(cs);
        ticks.set(ticks.get().wrapping_add(1));
        ticks.get()
    });

    SEQ.set_event(TICK);
    if ticks % TICKS_PER_SEC == 0 {
        SEQ.set_task(HOUSEKEEPING, LOW);
    }
}

fn sample(seq: &Sequencer<SleepOnIdle>) {
    seq.wait_event(TICK);

    let n = critical_section::with(|cs| {
        let samples = SAMPLES.borrow(cs);
        samples.set(samples.get().wrapping_add(1));
        samples.get()
    });
    if n % REPORT_EVERY == 0 {
        seq.set_task(REPORT, LOW);
    }

    seq.set_task(SAMPLE, HIGH);
}

fn report(seq: &Sequencer<SleepOnIdle>) {
    let samples = critical_section::with(|cs| SAMPLES.borrow(cs).get());
    info!("{} samples, {} sleeps", samples, seq.hooks().sleeps());
}

fn housekeeping(_seq: &Sequencer<SleepOnIdle>) {
    let ticks = critical_section::with(|cs| UPTIME_TICKS.borrow(cs).get());
    info!("uptime {}s", ticks / TICKS_PER_SEC);
}

#[esp_hal::main]
fn main() -> ! {
    esp_println::logger::init_logger_from_env();
    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    info!("booting...");

    SEQ.init();
    SEQ.register_task(SAMPLE, sample);
    SEQ.register_task(REPORT, report);
    SEQ.register_task(HOUSEKEEPING, housekeeping);
    SEQ.set_task(SAMPLE, HIGH);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    let mut timer0 = PeriodicTimer::new(timg0.timer0);
    critical_section::with(|cs| {
        timer0.set_interrupt_handler(timer0_handler);
        timer0.start(Duration::from_millis(TICK_MS)).unwrap();
        timer0.listen();
        TIMER0.borrow_ref_mut(cs).replace(timer0);
    });
    info!("timer initialized.");
    info!("sequencer ready.");

    SEQ.run_forever()
}
