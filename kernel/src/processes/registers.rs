use crate::{
    constants::registers::{NEXT_PC_REG, NUM_GP_REGS, NUM_TOTAL_REGS, PC_REG, PREV_PC_REG, STACK_REG},
    machine::Machine,
};
use core::fmt;

/// Snapshot of the user-visible register file.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct UserRegisters {
    regs: [i32; NUM_TOTAL_REGS],
}

impl UserRegisters {
    pub const fn new() -> Self {
        Self {
            regs: [0; NUM_TOTAL_REGS],
        }
    }

    pub fn get(&self, reg: usize) -> i32 {
        self.regs[reg]
    }

    pub fn set(&mut self, reg: usize, value: i32) {
        self.regs[reg] = value;
    }

    pub fn pc(&self) -> i32 {
        self.regs[PC_REG]
    }

    pub fn next_pc(&self) -> i32 {
        self.regs[NEXT_PC_REG]
    }

    pub fn stack_pointer(&self) -> i32 {
        self.regs[STACK_REG]
    }

    /// Writes every register into `machine`.
    pub fn load_into(&self, machine: &mut dyn Machine) {
        for (reg, &value) in self.regs.iter().enumerate() {
            machine.write_register(reg, value);
        }
    }
}

impl Default for UserRegisters {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for UserRegisters {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut ds = f.debug_struct("UserRegisters");

        ds.field("pc", &format_args!("{:#010x}", self.regs[PC_REG]))
            .field("next_pc", &format_args!("{:#010x}", self.regs[NEXT_PC_REG]))
            .field("prev_pc", &format_args!("{:#010x}", self.regs[PREV_PC_REG]))
            .field("sp", &format_args!("{:#010x}", self.regs[STACK_REG]))
            .field("gp", &&self.regs[..NUM_GP_REGS]);

        ds.finish()
    }
}
