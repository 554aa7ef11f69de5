//! Hosted RTOS port on top of `std` threads.
//!
//! Ticks are milliseconds since the first call. Thread suspension maps to
//! `park`/`unpark`, whose token keeps a resume that arrives before the
//! block. There are no real interrupts; [`run_as_interrupt`] marks the
//! calling thread as an interrupt context for the duration of a closure.

extern crate std;

use std::cell::Cell;
use std::collections::BTreeMap;
use std::eprintln;
use std::sync::{Mutex as StdMutex, OnceLock};
use std::thread::{self, Thread};
use std::time::{Duration, Instant};

use core::fmt;
use core::sync::atomic::{AtomicUsize, Ordering};

use ipcore_abi::status::WAIT_FOREVER;

use crate::kernel_services::rtos::{self, RtosServices, ThreadHandle};
use crate::klog;

static NEXT_THREAD: AtomicUsize = AtomicUsize::new(1);
static THREADS: StdMutex<BTreeMap<ThreadHandle, Thread>> = StdMutex::new(BTreeMap::new());
static EPOCH: OnceLock<Instant> = OnceLock::new();

std::thread_local! {
    static HANDLE: Cell<ThreadHandle> = const { Cell::new(0) };
    static IN_INTERRUPT: Cell<bool> = const { Cell::new(false) };
}

fn interrupt_disable() -> usize {
    0
}

fn interrupt_restore(_saved: usize) {}

fn in_interrupt() -> bool {
    IN_INTERRUPT.with(|flag| flag.get())
}

fn current_thread() -> ThreadHandle {
    HANDLE.with(|handle| {
        if handle.get() == 0 {
            let id = NEXT_THREAD.fetch_add(1, Ordering::Relaxed);
            if let Ok(mut threads) = THREADS.lock() {
                threads.insert(id, thread::current());
            }
            handle.set(id);
        }
        handle.get()
    })
}

fn thread_block(timeout_ticks: u64) {
    if timeout_ticks == WAIT_FOREVER {
        thread::park();
    } else {
        thread::park_timeout(Duration::from_millis(timeout_ticks));
    }
}

fn thread_resume(handle: ThreadHandle) {
    let target = THREADS
        .lock()
        .ok()
        .and_then(|threads| threads.get(&handle).cloned());
    if let Some(target) = target {
        target.unpark();
    }
}

fn thread_relinquish() {
    thread::yield_now();
}

fn thread_sleep(ticks: u64) {
    thread::sleep(Duration::from_millis(ticks));
}

fn tick_count() -> u64 {
    EPOCH.get_or_init(Instant::now).elapsed().as_millis() as u64
}

fn stderr_backend(args: fmt::Arguments<'_>) {
    eprintln!("{}", args);
}

static HOST_SERVICES: RtosServices = RtosServices {
    interrupt_disable,
    interrupt_restore,
    in_interrupt,
    current_thread,
    thread_block,
    thread_resume,
    thread_relinquish,
    thread_sleep,
    tick_count,
};

/// Register the hosted services and the stderr log backend at `Debug`.
/// Idempotent.
pub fn install() {
    EPOCH.get_or_init(Instant::now);
    rtos::register_rtos_services(&HOST_SERVICES);
    klog::klog_register_backend(stderr_backend);
    klog::klog_set_level(klog::KlogLevel::Debug);
}

/// Run `f` with the calling thread flagged as interrupt context.
pub fn run_as_interrupt<R>(f: impl FnOnce() -> R) -> R {
    let previous = IN_INTERRUPT.with(|flag| flag.replace(true));
    let result = f();
    IN_INTERRUPT.with(|flag| flag.set(previous));
    result
}
