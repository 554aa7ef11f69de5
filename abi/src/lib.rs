//! IP core ABI constants
//!
//! Numeric codes shared with C-style ports and drivers: status codes, link
//! driver command codes, helper event bits and wait options. Typed wrappers
//! live in `ipcore-net`; this crate only fixes the numbers.

#![no_std]
#![forbid(unsafe_code)]

pub mod net;
pub mod status;
