//! Kernel entry for every user-mode trap.
//!
//! Syscall traps advance the program counters and go to the syscall
//! dispatcher. Everything else is a fault, handled per [`FaultPolicy`].

use crate::{
    config::FaultPolicy,
    constants::{
        processes::INSTRUCTION_WIDTH,
        registers::{BAD_VADDR_REG, NEXT_PC_REG, PC_REG, PREV_PC_REG},
        syscalls::SYSCALL_FAILED,
    },
    interrupts::TrapOutcome,
    kernel::Kernel,
    machine::{Machine, TrapContext},
    syscalls::syscall_handlers::dispatch_syscall,
};
use alloc::string::ToString;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionType {
    NoException,
    Syscall,
    /// No valid translation for the address.
    PageFault,
    /// Write to a page marked read-only.
    ReadOnly,
    /// Translation produced an invalid physical address.
    BusError,
    /// Unaligned or out-of-range virtual address.
    AddressError,
    /// Integer overflow in add or sub.
    Overflow,
    IllegalInstr,
}

impl ExceptionType {
    /// Maps the machine's numeric exception code.
    pub fn from_code(code: i32) -> Option<Self> {
        let which = match code {
            0 => ExceptionType::NoException,
            1 => ExceptionType::Syscall,
            2 => ExceptionType::PageFault,
            3 => ExceptionType::ReadOnly,
            4 => ExceptionType::BusError,
            5 => ExceptionType::AddressError,
            6 => ExceptionType::Overflow,
            7 => ExceptionType::IllegalInstr,
            _ => return None,
        };
        Some(which)
    }

    pub fn is_fault(self) -> bool {
        !matches!(self, ExceptionType::NoException | ExceptionType::Syscall)
    }
}

/// Moves past the trapping instruction: prev <- pc, pc <- next, next += 4.
pub fn advance_pc(machine: &mut dyn Machine) {
    let pc = machine.read_register(PC_REG);
    let next_pc = machine.read_register(NEXT_PC_REG);
    machine.write_register(PREV_PC_REG, pc);
    machine.write_register(PC_REG, next_pc);
    machine.write_register(NEXT_PC_REG, next_pc + INSTRUCTION_WIDTH);
}

impl Kernel {
    /// Handles one trap raised by the unit the scheduler reports as current.
    pub fn handle_exception(&self, which: ExceptionType, ctx: &mut TrapContext<'_>) -> TrapOutcome {
        match which {
            ExceptionType::NoException => TrapOutcome::Resume,
            ExceptionType::Syscall => {
                advance_pc(ctx.machine);
                dispatch_syscall(self, ctx)
            }
            fault => self.handle_fault(fault, ctx),
        }
    }

    fn handle_fault(&self, which: ExceptionType, ctx: &mut TrapContext<'_>) -> TrapOutcome {
        let pid = ctx.scheduler.current();
        let name = ctx.scheduler.current_name().to_string();
        log::warn!(
            "{:?} in unit {} ({}), pc {:#x}, bad address {:#x}",
            which,
            pid,
            name,
            ctx.machine.read_register(PC_REG),
            ctx.machine.read_register(BAD_VADDR_REG)
        );

        match self.config().fault_policy {
            FaultPolicy::TerminateUnit => {
                log::info!("terminating unit {} ({}) after {:?}", pid, name, which);
                self.terminate(pid, SYSCALL_FAILED);
                ctx.scheduler.finish();
                TrapOutcome::Finished
            }
            FaultPolicy::Legacy if self.main_unit() == Some(pid) => {
                log::error!("fatal {:?} in the main unit, halting", which);
                ctx.interrupt.halt();
                TrapOutcome::Halted
            }
            FaultPolicy::Legacy => TrapOutcome::Resume,
        }
    }
}
