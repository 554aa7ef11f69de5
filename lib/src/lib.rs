#![cfg_attr(not(test), no_std)]

pub mod clock;
pub mod cmdline;
pub mod event_flags;
#[cfg(feature = "host")]
pub mod host;
pub mod kernel_services;
pub mod klog;
pub mod mutex;
pub mod service_cell;
pub mod service_macro;
pub mod spinlock;
pub mod testing;
pub mod waitqueue;

#[doc(hidden)]
pub use paste;

pub use clock::Deadline;
pub use event_flags::EventFlags;
pub use klog::{KlogLevel, klog_is_enabled, klog_register_backend, klog_set_level};
pub use mutex::{Mutex, MutexGuard};
pub use service_cell::ServiceCell;
pub use spinlock::{IrqMutex, IrqMutexGuard};
pub use waitqueue::WaitQueue;
