//! Service tables through which the core reaches the surrounding RTOS.

pub mod rtos;
