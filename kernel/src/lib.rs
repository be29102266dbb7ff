#![cfg_attr(not(test), no_std)]
#![cfg_attr(feature = "strict", deny(warnings))]
extern crate alloc;

pub mod config;
pub mod constants;
pub mod devices;
pub mod filesys;
pub mod interrupts;
pub mod kernel;
pub mod logging;
pub mod machine;
pub mod memory;
pub mod processes;
pub mod syscalls;

#[cfg(test)]
mod testing;

pub mod prelude {
    pub use crate::{
        config::{FaultPolicy, JoinPolicy, KernelConfig},
        interrupts::{ExceptionType, TrapOutcome},
        kernel::Kernel,
        machine::{ByteStreams, IntLevel, Interrupt, Machine, Scheduler, TrapContext, UnitId},
        memory::{FrameAllocator, FrameBitmap, PlacementStrategy},
    };
}
