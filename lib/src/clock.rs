//! Tick arithmetic on top of the RTOS tick counter.
//!
//! Wait budgets are expressed in ticks; `WAIT_FOREVER` never expires and
//! `NO_WAIT` expires immediately. Before the RTOS services are registered
//! the clock reads `0`.

use ipcore_abi::status::WAIT_FOREVER;

use crate::kernel_services::rtos;

#[inline]
pub fn ticks() -> u64 {
    if rtos::is_rtos_initialized() {
        rtos::tick_count()
    } else {
        0
    }
}

/// Absolute expiry of a wait budget started now.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Deadline {
    at: Option<u64>,
}

impl Deadline {
    pub fn after(wait_ticks: u64) -> Self {
        if wait_ticks == WAIT_FOREVER {
            Self { at: None }
        } else {
            Self {
                at: Some(ticks().saturating_add(wait_ticks)),
            }
        }
    }

    pub fn expired(&self) -> bool {
        match self.at {
            Some(at) => ticks() >= at,
            None => false,
        }
    }

    /// Ticks left before expiry, `WAIT_FOREVER` for an unbounded deadline.
    pub fn remaining(&self) -> u64 {
        match self.at {
            Some(at) => at.saturating_sub(ticks()),
            None => WAIT_FOREVER,
        }
    }
}
