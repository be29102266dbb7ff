//! Register numbering of the simulated CPU.

pub const NUM_GP_REGS: usize = 32;
pub const STACK_REG: usize = 29;
pub const RET_ADDR_REG: usize = 31;
pub const HI_REG: usize = 32;
pub const LO_REG: usize = 33;
pub const PC_REG: usize = 34;
pub const NEXT_PC_REG: usize = 35;
pub const PREV_PC_REG: usize = 36;
pub const LOAD_REG: usize = 37;
pub const LOAD_VALUE_REG: usize = 38;
pub const BAD_VADDR_REG: usize = 39;
pub const NUM_TOTAL_REGS: usize = 40;

// Syscall calling convention
pub const SYSCALL_CODE_REG: usize = 2;
pub const SYSCALL_RESULT_REG: usize = 2;
pub const SYSCALL_ARG1_REG: usize = 4;
pub const SYSCALL_ARG2_REG: usize = 5;
pub const SYSCALL_ARG3_REG: usize = 6;
pub const SYSCALL_ARG4_REG: usize = 7;
