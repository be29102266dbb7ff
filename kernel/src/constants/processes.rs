//! Executable loading and user stack layout.

/// Magic tag at offset 0 of every NOFF executable.
pub const NOFF_MAGIC: u32 = 0x00BA_DFAD;

/// Bytes reserved at the top of every address space for the user stack.
pub const USER_STACK_SIZE: usize = 1024;

/// Distance kept between the initial stack pointer and the end of the space.
pub const STACK_SAFETY_MARGIN: usize = 16;

/// Width of one instruction in bytes.
pub const INSTRUCTION_WIDTH: i32 = 4;

/// Name of the unit created by the bootstrap launch.
pub const MAIN_UNIT_NAME: &str = "main";
