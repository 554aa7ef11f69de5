//! Write-once-style holder for a registered service table.

use core::sync::atomic::{AtomicPtr, Ordering};

/// Holds a `&'static T` published by the port during startup.
///
/// Registration may be repeated (a hosted test binary installs the same
/// table from every test); the last registration wins.
pub struct ServiceCell<T: 'static> {
    ptr: AtomicPtr<T>,
}

// SAFETY: the cell only ever stores `&'static T` and hands out shared
// references to it.
unsafe impl<T: Sync> Sync for ServiceCell<T> {}

impl<T> ServiceCell<T> {
    pub const fn new() -> Self {
        Self {
            ptr: AtomicPtr::new(core::ptr::null_mut()),
        }
    }

    pub fn register(&self, services: &'static T) {
        self.ptr
            .store(services as *const T as *mut T, Ordering::Release);
    }

    #[inline]
    pub fn is_registered(&self) -> bool {
        !self.ptr.load(Ordering::Acquire).is_null()
    }

    #[inline]
    pub fn try_get(&self) -> Option<&'static T> {
        let ptr = self.ptr.load(Ordering::Acquire);
        // SAFETY: non-null pointers were stored from a `&'static T`.
        unsafe { ptr.as_ref() }
    }

    /// Panics when the port never registered its table; every caller of a
    /// service runs after port bring-up.
    #[inline]
    pub fn get(&self) -> &'static T {
        match self.try_get() {
            Some(services) => services,
            None => panic!("service table used before registration"),
        }
    }
}

impl<T> Default for ServiceCell<T> {
    fn default() -> Self {
        Self::new()
    }
}
