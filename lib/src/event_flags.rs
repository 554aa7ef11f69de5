//! 32-bit event flag group.
//!
//! Producers OR bits in from any context, including interrupt handlers.
//! A consumer waits for any bit of a mask and atomically takes (clears)
//! only the bits it matched; bits outside its mask stay pending for
//! whoever handles them.

use core::cell::Cell;

use crate::IrqMutex;
use crate::waitqueue::WaitQueue;

pub struct EventFlags {
    bits: IrqMutex<u32>,
    waiters: WaitQueue,
}

impl EventFlags {
    pub const fn new() -> Self {
        Self {
            bits: IrqMutex::new(0),
            waiters: WaitQueue::new(),
        }
    }

    /// OR `bits` into the group and wake every waiter. Interrupt safe.
    pub fn set(&self, bits: u32) {
        if bits == 0 {
            return;
        }
        *self.bits.lock() |= bits;
        self.waiters.wake_all();
    }

    /// Clear `bits` without waking anyone.
    pub fn clear(&self, bits: u32) {
        *self.bits.lock() &= !bits;
    }

    pub fn pending(&self) -> u32 {
        *self.bits.lock()
    }

    /// Take any of `mask` that is set without blocking.
    pub fn try_take(&self, mask: u32) -> Option<u32> {
        let mut bits = self.bits.lock();
        let hit = *bits & mask;
        if hit == 0 {
            return None;
        }
        *bits &= !hit;
        Some(hit)
    }

    /// Wait up to `wait_ticks` for any bit in `mask`, then clear and return
    /// the matched bits. `None` means the budget ran out first.
    pub fn wait_any_clear(&self, mask: u32, wait_ticks: u64) -> Option<u32> {
        let taken = Cell::new(0u32);
        let ready = self.waiters.wait_event_timeout(
            || match self.try_take(mask) {
                Some(hit) => {
                    taken.set(hit);
                    true
                }
                None => false,
            },
            wait_ticks,
        );
        if ready { Some(taken.get()) } else { None }
    }
}

impl Default for EventFlags {
    fn default() -> Self {
        Self::new()
    }
}
