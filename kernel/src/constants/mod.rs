//! System-wide constants describing the simulated machine.

pub mod memory;
pub mod processes;
pub mod registers;
pub mod syscalls;
