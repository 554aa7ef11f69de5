//! Wait queue primitive for blocking/waking RTOS threads.
//!
//! Provides a fixed-capacity queue of blocked threads that can be woken
//! individually (`wake_one`) or all at once (`wake_all`). Integrates with
//! the RTOS through the `rtos` service table.
//!
//! - Fixed-capacity array of opaque thread handles, FIFO by arrival
//! - Protected by `IrqMutex` so producers may wake from interrupt context
//! - The port's `thread_block` keeps a resume that races ahead of the block
//!
//! ```rust,ignore
//! static MY_WQ: WaitQueue = WaitQueue::new();
//!
//! // Waiting side (consumer):
//! MY_WQ.wait_event_timeout(|| has_data(), 100);
//!
//! // Waking side (producer):
//! MY_WQ.wake_one();
//! ```

use ipcore_abi::status::NO_WAIT;

use crate::IrqMutex;
use crate::clock::Deadline;
use crate::kernel_services::rtos::{self, NULL_THREAD, ThreadHandle};

/// Maximum number of threads that can wait on a single `WaitQueue`.
const WAITQUEUE_CAPACITY: usize = 32;

struct WaitQueueInner {
    /// Waiting threads in arrival order; only `waiters[..count]` is live.
    waiters: [ThreadHandle; WAITQUEUE_CAPACITY],
    count: usize,
}

impl WaitQueueInner {
    const fn new() -> Self {
        Self {
            waiters: [NULL_THREAD; WAITQUEUE_CAPACITY],
            count: 0,
        }
    }

    /// Add `thread` to the tail. Returns `false` if full.
    fn enqueue(&mut self, thread: ThreadHandle) -> bool {
        if thread == NULL_THREAD || self.count == WAITQUEUE_CAPACITY {
            return false;
        }
        if self.waiters[..self.count].contains(&thread) {
            return true;
        }
        self.waiters[self.count] = thread;
        self.count += 1;
        true
    }

    fn dequeue_one(&mut self) -> Option<ThreadHandle> {
        if self.count == 0 {
            return None;
        }
        let thread = self.waiters[0];
        self.waiters.copy_within(1..self.count, 0);
        self.count -= 1;
        self.waiters[self.count] = NULL_THREAD;
        Some(thread)
    }

    fn remove_thread(&mut self, thread: ThreadHandle) -> bool {
        match self.waiters[..self.count].iter().position(|&t| t == thread) {
            Some(pos) => {
                self.waiters.copy_within(pos + 1..self.count, pos);
                self.count -= 1;
                self.waiters[self.count] = NULL_THREAD;
                true
            }
            None => false,
        }
    }
}

/// A wait queue for blocking and waking RTOS threads.
pub struct WaitQueue {
    inner: IrqMutex<WaitQueueInner>,
}

impl WaitQueue {
    pub const fn new() -> Self {
        Self {
            inner: IrqMutex::new(WaitQueueInner::new()),
        }
    }

    /// Block the calling thread until `condition()` returns `true` or
    /// `timeout_ticks` elapse. `WAIT_FOREVER` never times out, `NO_WAIT`
    /// only evaluates the condition once.
    ///
    /// The condition is re-evaluated under the queue lock before sleeping.
    /// Producers make the condition true first and wake second, so a wake
    /// can never slip between the check and the enqueue.
    ///
    /// Returns `true` if the condition was met, `false` on timeout or when
    /// the queue is full.
    pub fn wait_event_timeout<F: Fn() -> bool>(&self, condition: F, timeout_ticks: u64) -> bool {
        if condition() {
            return true;
        }
        if timeout_ticks == NO_WAIT || !rtos::is_rtos_initialized() {
            return false;
        }

        let deadline = Deadline::after(timeout_ticks);
        let thread = rtos::current_thread();
        if thread == NULL_THREAD {
            return false;
        }

        loop {
            {
                let mut inner = self.inner.lock();
                if condition() {
                    inner.remove_thread(thread);
                    return true;
                }
                if deadline.expired() {
                    inner.remove_thread(thread);
                    return false;
                }
                if !inner.enqueue(thread) {
                    return false;
                }
            }

            rtos::thread_block(deadline.remaining());
        }
    }

    /// Wake the longest-waiting thread. Returns `true` if one was woken.
    pub fn wake_one(&self) -> bool {
        let thread = self.inner.lock().dequeue_one();

        if let Some(thread) = thread {
            rtos::thread_resume(thread);
            true
        } else {
            false
        }
    }

    /// Wake all waiting threads. Returns the number woken.
    pub fn wake_all(&self) -> usize {
        // Collect under the lock, resume outside it.
        let mut threads = [NULL_THREAD; WAITQUEUE_CAPACITY];
        let count = {
            let mut inner = self.inner.lock();
            let count = inner.count;
            threads[..count].copy_from_slice(&inner.waiters[..count]);
            inner.waiters = [NULL_THREAD; WAITQUEUE_CAPACITY];
            inner.count = 0;
            count
        };

        for &thread in &threads[..count] {
            rtos::thread_resume(thread);
        }
        count
    }

    pub fn waiter_count(&self) -> usize {
        self.inner.lock().count
    }
}

impl Default for WaitQueue {
    fn default() -> Self {
        Self::new()
    }
}
