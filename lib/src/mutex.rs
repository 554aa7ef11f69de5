//! Blocking, thread-only mutex.
//!
//! Guards state that is edited through read-modify-write sequences by
//! application threads and the helper task (interface table, gateway,
//! static routes). A contended locker suspends on the mutex's wait queue
//! and is resumed by the releasing guard, so a low-priority owner gets to
//! run and finish. Never take this lock from interrupt context; use
//! [`IrqMutex`](crate::IrqMutex) there.

use core::mem::ManuallyDrop;
use core::ops::{Deref, DerefMut};

use ipcore_abi::status::WAIT_FOREVER;
use spin::mutex::{SpinMutex, SpinMutexGuard};

use crate::WaitQueue;
use crate::kernel_services::rtos;

pub struct Mutex<T> {
    inner: SpinMutex<T>,
    waiters: WaitQueue,
}

pub struct MutexGuard<'a, T> {
    guard: ManuallyDrop<SpinMutexGuard<'a, T>>,
    waiters: &'a WaitQueue,
}

impl<T> Mutex<T> {
    pub const fn new(data: T) -> Self {
        Self {
            inner: SpinMutex::new(data),
            waiters: WaitQueue::new(),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, T> {
        debug_assert!(
            !(rtos::is_rtos_initialized() && rtos::in_interrupt()),
            "thread mutex taken from interrupt context"
        );
        loop {
            if let Some(guard) = self.try_lock() {
                return guard;
            }
            if !rtos::is_rtos_initialized() {
                core::hint::spin_loop();
                continue;
            }
            // The release clears the lock before waking, and the condition
            // is re-read under the queue lock, so a release is never missed.
            if !self
                .waiters
                .wait_event_timeout(|| !self.inner.is_locked(), WAIT_FOREVER)
            {
                // Wait queue full.
                rtos::thread_relinquish();
            }
        }
    }

    #[inline]
    pub fn try_lock(&self) -> Option<MutexGuard<'_, T>> {
        self.inner.try_lock().map(|guard| MutexGuard {
            guard: ManuallyDrop::new(guard),
            waiters: &self.waiters,
        })
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }

    /// Threads currently suspended waiting for the lock.
    pub fn waiter_count(&self) -> usize {
        self.waiters.waiter_count()
    }
}

impl<T: Default> Default for Mutex<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Deref for MutexGuard<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for MutexGuard<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

impl<T> Drop for MutexGuard<'_, T> {
    fn drop(&mut self) {
        // SAFETY: the inner guard is dropped exactly once, here, and is never
        // touched again.
        unsafe { ManuallyDrop::drop(&mut self.guard) };
        self.waiters.wake_one();
    }
}
