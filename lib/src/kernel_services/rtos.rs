//! RTOS primitives consumed by the IP core.
//!
//! The port registers one [`RtosServices`] table at startup. Everything the
//! core needs from the kernel underneath (interrupt masking, thread
//! suspension, ticks) goes through these forwarding functions.

/// Opaque thread identity handed out by the port. `0` is never a live thread.
pub type ThreadHandle = usize;

pub const NULL_THREAD: ThreadHandle = 0;

crate::define_service! {
    rtos => RtosServices {
        /// Mask interrupts on the calling CPU and return the previous state.
        interrupt_disable() -> usize;
        /// Restore a state returned by `interrupt_disable`. Nests.
        interrupt_restore(saved: usize);
        in_interrupt() -> bool;
        current_thread() -> ThreadHandle;
        /// Suspend the caller until `thread_resume` or `timeout_ticks` elapse.
        /// A resume delivered before the caller blocks must not be lost.
        thread_block(timeout_ticks: u64);
        thread_resume(thread: ThreadHandle);
        thread_relinquish();
        thread_sleep(ticks: u64);
        tick_count() -> u64;
    }
}
