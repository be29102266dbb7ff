// Syscall numbers
pub const SYSCALL_HALT: i32 = 0;
pub const SYSCALL_EXIT: i32 = 1;
pub const SYSCALL_EXEC: i32 = 2;
pub const SYSCALL_JOIN: i32 = 3;
pub const SYSCALL_CREATE: i32 = 4;
pub const SYSCALL_OPEN: i32 = 5;
pub const SYSCALL_READ: i32 = 6;
pub const SYSCALL_WRITE: i32 = 7;
pub const SYSCALL_CLOSE: i32 = 8;
pub const SYSCALL_FORK: i32 = 9;
pub const SYSCALL_YIELD: i32 = 10;

// Stream ids
pub const CONSOLE_INPUT: i32 = 0;
pub const CONSOLE_OUTPUT: i32 = 1;

// Transfer limits
pub const MAX_WRITE_BYTES: usize = 500;
pub const MAX_PATH_LEN: usize = 100;
/// Largest single request handed to a host stream by `Read`.
pub const STREAM_CHUNK_BYTES: usize = 128;

/// Value written to the result register when a call is rejected.
pub const SYSCALL_FAILED: i32 = -1;
