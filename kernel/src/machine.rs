//! Capabilities the kernel consumes from the simulated machine and its host.
//!
//! None of these are implemented here: the CPU emulator, the thread scheduler,
//! the interrupt controller and the host's open-file table sit behind these
//! traits, and the trap dispatcher reaches them through a [`TrapContext`].

use crate::{
    devices::console::Console, filesys::FileSystem, processes::address_space::TranslationEntry,
};
use alloc::boxed::Box;

/// Identity of a schedulable unit.
pub type UnitId = u32;

/// Routine a freshly forked unit runs once the scheduler first picks it.
pub type UnitEntry = Box<dyn FnOnce(&mut dyn Machine) + Send>;

/// The simulated CPU: register file, translated memory and raw main memory.
pub trait Machine {
    fn read_register(&self, reg: usize) -> i32;
    fn write_register(&mut self, reg: usize, value: i32);

    /// Reads `size` bytes at virtual `addr` through the active translation.
    /// `None` if the access faults.
    fn read_mem(&mut self, addr: i32, size: usize) -> Option<i32>;

    /// Writes `size` bytes at virtual `addr`; `false` if the access faults.
    fn write_mem(&mut self, addr: i32, size: usize, value: i32) -> bool;

    /// Physical memory, indexed by frame number times page size.
    fn main_memory(&mut self) -> &mut [u8];

    /// Makes `table` the translation used for every user access.
    fn install_translation(&mut self, table: &[TranslationEntry]);

    /// Resumes user-mode execution with the current registers.
    fn run(&mut self);
}

pub trait Scheduler {
    /// Unit that raised the trap being handled.
    fn current(&self) -> UnitId;

    fn current_name(&self) -> &str;

    /// Hands a new unit to the run queue.
    fn fork(&mut self, unit: UnitId, name: &str, entry: UnitEntry);

    /// Gives up the processor; returns once the caller is picked again.
    fn yield_now(&mut self);

    /// Retires the current unit after its trap returns.
    fn finish(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntLevel {
    Off,
    On,
}

pub trait Interrupt {
    /// Sets the interrupt level, returning the previous one.
    fn set_level(&mut self, level: IntLevel) -> IntLevel;

    /// Orderly shutdown of the whole machine.
    fn halt(&mut self);
}

/// Executes a closure with interrupts disabled, restoring the previous level.
pub fn without_interrupts<F, R>(interrupt: &mut dyn Interrupt, f: F) -> R
where
    F: FnOnce() -> R,
{
    let previous = interrupt.set_level(IntLevel::Off);
    let result = f();
    interrupt.set_level(previous);
    result
}

/// Host byte streams for ids 2 and up.
pub trait ByteStreams {
    fn read(&mut self, stream: i32, buf: &mut [u8]) -> usize;
    fn write(&mut self, stream: i32, buf: &[u8]) -> usize;
}

/// Everything a single trap may touch.
pub struct TrapContext<'a> {
    pub machine: &'a mut dyn Machine,
    pub scheduler: &'a mut dyn Scheduler,
    pub interrupt: &'a mut dyn Interrupt,
    pub files: &'a mut dyn FileSystem,
    pub console: &'a mut dyn Console,
    pub streams: &'a mut dyn ByteStreams,
}
