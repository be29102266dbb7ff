//! System call decoding and handlers.

use crate::{
    constants::{
        registers::{SYSCALL_ARG1_REG, SYSCALL_ARG2_REG, SYSCALL_ARG3_REG, SYSCALL_CODE_REG},
        syscalls::*,
    },
    filesys::FsError,
    machine::Machine,
    processes::LoadError,
};
use alloc::string::String;

pub mod syscall_handlers;

/// A decoded system call. Arguments come from r4..r6, the code from r2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syscall {
    Halt,
    Exit { status: i32 },
    Exec { path_addr: i32 },
    Join { unit: i32 },
    Yield,
    Read { buffer: i32, count: i32, stream: i32 },
    Write { buffer: i32, count: i32, stream: i32 },
    /// A code the interface defines but this kernel does not implement.
    Unsupported(i32),
    Unknown(i32),
}

impl Syscall {
    pub fn decode(machine: &dyn Machine) -> Self {
        let code = machine.read_register(SYSCALL_CODE_REG);
        let arg1 = machine.read_register(SYSCALL_ARG1_REG);
        let arg2 = machine.read_register(SYSCALL_ARG2_REG);
        let arg3 = machine.read_register(SYSCALL_ARG3_REG);

        match code {
            SYSCALL_HALT => Syscall::Halt,
            SYSCALL_EXIT => Syscall::Exit { status: arg1 },
            SYSCALL_EXEC => Syscall::Exec { path_addr: arg1 },
            SYSCALL_JOIN => Syscall::Join { unit: arg1 },
            SYSCALL_YIELD => Syscall::Yield,
            SYSCALL_READ => Syscall::Read {
                buffer: arg1,
                count: arg2,
                stream: arg3,
            },
            SYSCALL_WRITE => Syscall::Write {
                buffer: arg1,
                count: arg2,
                stream: arg3,
            },
            SYSCALL_CREATE | SYSCALL_OPEN | SYSCALL_CLOSE | SYSCALL_FORK => {
                Syscall::Unsupported(code)
            }
            _ => Syscall::Unknown(code),
        }
    }
}

/// Why an `Exec` (or the bootstrap launch) was rejected.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("path argument at {0:#x} is not readable")]
    PathUnreadable(i32),
    #[error("path argument is longer than {} bytes", MAX_PATH_LEN)]
    PathTooLong,
    #[error("cannot open {path}: {source}")]
    Open { path: String, source: FsError },
    #[error("cannot load {path}: {source}")]
    Load { path: String, source: LoadError },
    #[error("no previous launch to repeat")]
    NothingToRelaunch,
}
