use crate::{
    config::JoinPolicy,
    constants::{
        registers::SYSCALL_RESULT_REG,
        syscalls::{
            CONSOLE_INPUT, CONSOLE_OUTPUT, MAX_PATH_LEN, MAX_WRITE_BYTES, STREAM_CHUNK_BYTES,
            SYSCALL_FAILED,
        },
    },
    interrupts::TrapOutcome,
    kernel::Kernel,
    machine::{Machine, TrapContext, UnitId},
    processes::ProcessState,
    syscalls::{ExecError, Syscall},
};
use alloc::string::String;
use arrayvec::ArrayVec;

/// Decodes the syscall in the trapped unit's registers and runs it. The
/// program counters have already been advanced past the trap.
pub fn dispatch_syscall(kernel: &Kernel, ctx: &mut TrapContext<'_>) -> TrapOutcome {
    let syscall = Syscall::decode(ctx.machine);
    log::trace!("unit {} trapped with {:?}", ctx.scheduler.current(), syscall);

    let result = match syscall {
        Syscall::Halt => return sys_halt(ctx),
        Syscall::Exit { status } => return sys_exit(kernel, ctx, status),
        Syscall::Exec { path_addr } => match sys_exec(kernel, ctx, path_addr) {
            Ok(pid) => pid as i32,
            Err(ExecError::PathUnreadable(addr)) => {
                log::debug!("Exec path at {:#x} unreadable", addr);
                SYSCALL_FAILED
            }
            Err(err) => {
                log::warn!("Exec rejected: {}", err);
                SYSCALL_FAILED
            }
        },
        Syscall::Join { unit } => sys_join(kernel, ctx, unit),
        Syscall::Yield => {
            sys_yield(ctx);
            return TrapOutcome::Resume;
        }
        Syscall::Read {
            buffer,
            count,
            stream,
        } => sys_read(ctx, buffer, count, stream),
        Syscall::Write {
            buffer,
            count,
            stream,
        } => sys_write(ctx, buffer, count, stream),
        Syscall::Unsupported(code) => {
            log::warn!("syscall {} is not supported", code);
            return TrapOutcome::Resume;
        }
        Syscall::Unknown(code) => {
            log::warn!("not a valid syscall: {}", code);
            return TrapOutcome::Resume;
        }
    };

    ctx.machine.write_register(SYSCALL_RESULT_REG, result);
    TrapOutcome::Resume
}

fn sys_halt(ctx: &mut TrapContext<'_>) -> TrapOutcome {
    log::info!("shutdown, initiated by unit {}", ctx.scheduler.current_name());
    ctx.interrupt.halt();
    TrapOutcome::Halted
}

fn sys_exit(kernel: &Kernel, ctx: &mut TrapContext<'_>, status: i32) -> TrapOutcome {
    let pid = ctx.scheduler.current();
    log::info!(
        "unit {} ({}) exited with status {}",
        pid,
        ctx.scheduler.current_name(),
        status
    );

    if !kernel.terminate(pid, status) {
        log::debug!("unit {} has no live process entry", pid);
    }
    ctx.scheduler.finish();
    TrapOutcome::Finished
}

/// Launches the program named by the NUL-terminated string at `path_addr`.
pub fn sys_exec(
    kernel: &Kernel,
    ctx: &mut TrapContext<'_>,
    path_addr: i32,
) -> Result<UnitId, ExecError> {
    let path = read_user_string(ctx.machine, path_addr)?;
    log::info!(
        "Exec({}) invoked by unit {} ({})",
        path,
        ctx.scheduler.current(),
        ctx.scheduler.current_name()
    );
    let parent = ctx.scheduler.current();
    kernel.launch(&path, &path, Some(parent), ctx)
}

/// Waits for `unit` according to the configured [`JoinPolicy`].
pub fn sys_join(kernel: &Kernel, ctx: &mut TrapContext<'_>, unit: i32) -> i32 {
    match kernel.config().join_policy {
        JoinPolicy::WaitForExit => wait_for_exit(kernel, ctx, unit),
        JoinPolicy::RelaunchLastPath => {
            let parent = ctx.scheduler.current();
            let relaunched = kernel
                .last_exec_path()
                .ok_or(ExecError::NothingToRelaunch)
                .and_then(|path| kernel.launch(&path, &path, Some(parent), ctx));
            match relaunched {
                Ok(pid) => {
                    log::info!("Join({}) relaunched the last program as unit {}", unit, pid);
                    0
                }
                Err(err) => {
                    log::warn!("Join({}) could not relaunch: {}", unit, err);
                    SYSCALL_FAILED
                }
            }
        }
    }
}

fn wait_for_exit(kernel: &Kernel, ctx: &mut TrapContext<'_>, unit: i32) -> i32 {
    let caller = ctx.scheduler.current();
    let child = match UnitId::try_from(unit)
        .ok()
        .filter(|&pid| pid != caller)
        .and_then(|pid| kernel.processes().get(pid))
    {
        Some(child) => child,
        None => {
            log::warn!("Join({}) from unit {}: no such child", unit, caller);
            return SYSCALL_FAILED;
        }
    };

    let waiter = kernel.processes().get(caller);
    if let Some(waiter) = &waiter {
        waiter.set_state(ProcessState::Blocked);
    }

    let status = loop {
        if let Some(status) = child.exit_status() {
            break status;
        }
        ctx.scheduler.yield_now();
    };

    if let Some(waiter) = &waiter {
        waiter.set_state(ProcessState::Running);
    }
    kernel.processes().remove(child.pid);
    log::info!(
        "unit {} joined unit {} ({}), status {}",
        caller,
        child.pid,
        child.name,
        status
    );
    status
}

fn sys_yield(ctx: &mut TrapContext<'_>) {
    log::debug!("unit {} yields", ctx.scheduler.current());
    ctx.scheduler.yield_now();
}

/// Reads at most `count` bytes from `stream` into the caller's buffer and
/// returns how many landed before any terminator.
pub fn sys_read(ctx: &mut TrapContext<'_>, buffer: i32, count: i32, stream: i32) -> i32 {
    let count = match usize::try_from(count) {
        Ok(count) if count > 0 && stream >= 0 => count,
        _ => {
            log::debug!("read of 0 bytes (count {}, stream {})", count, stream);
            return 0;
        }
    };

    let transferred = if stream == CONSOLE_INPUT {
        let mut bytes = ctx.console.read_line().map(String::into_bytes).unwrap_or_default();
        bytes.truncate(count);
        bytes.push(0);
        copy_to_user(ctx.machine, buffer, &bytes)
    } else {
        read_stream(ctx, buffer, count, stream)
    };

    log::debug!("read {} bytes from stream {}", transferred, stream);
    transferred as i32
}

// Moves stream bytes into user memory a chunk at a time until `count` bytes,
// a short read from the stream, a terminator or a faulting address.
fn read_stream(ctx: &mut TrapContext<'_>, buffer: i32, count: usize, stream: i32) -> usize {
    let mut chunk = [0u8; STREAM_CHUNK_BYTES];
    let mut transferred = 0;
    while transferred < count {
        let wanted = (count - transferred).min(STREAM_CHUNK_BYTES);
        let got = ctx.streams.read(stream, &mut chunk[..wanted]).min(wanted);
        let copied = copy_to_user(
            ctx.machine,
            buffer.wrapping_add(transferred as i32),
            &chunk[..got],
        );
        transferred += copied;
        if copied < got || got < wanted {
            break;
        }
    }
    transferred
}

/// Writes the caller's buffer, up to a terminator or the transfer cap, to `stream`.
pub fn sys_write(ctx: &mut TrapContext<'_>, buffer: i32, count: i32, stream: i32) -> i32 {
    let limit = match usize::try_from(count) {
        Ok(count) if count > 0 => count.min(MAX_WRITE_BYTES),
        _ => MAX_WRITE_BYTES,
    };
    let bytes = copy_from_user(ctx.machine, buffer, limit);
    if bytes.is_empty() {
        log::debug!("write of 0 bytes to stream {}", stream);
        return 0;
    }

    match stream {
        CONSOLE_OUTPUT => {
            ctx.console.write(&bytes);
            bytes.len() as i32
        }
        s if s > CONSOLE_OUTPUT => ctx.streams.write(s, &bytes) as i32,
        _ => {
            log::warn!("write to invalid stream {}", stream);
            SYSCALL_FAILED
        }
    }
}

/// Copies a NUL-terminated path out of user memory one byte at a time.
fn read_user_string(machine: &mut dyn Machine, addr: i32) -> Result<String, ExecError> {
    let mut path: ArrayVec<u8, MAX_PATH_LEN> = ArrayVec::new();
    for offset in 0.. {
        let byte = machine
            .read_mem(addr.wrapping_add(offset), 1)
            .ok_or(ExecError::PathUnreadable(addr))? as u8;
        if byte == 0 {
            break;
        }
        path.try_push(byte).map_err(|_| ExecError::PathTooLong)?;
    }
    Ok(String::from_utf8_lossy(&path).into_owned())
}

/// Reads bytes until a terminator, a faulting address or `limit`.
fn copy_from_user(machine: &mut dyn Machine, addr: i32, limit: usize) -> ArrayVec<u8, MAX_WRITE_BYTES> {
    let mut bytes = ArrayVec::new();
    for offset in 0..limit.min(MAX_WRITE_BYTES) {
        match machine.read_mem(addr.wrapping_add(offset as i32), 1) {
            Some(0) | None => break,
            Some(value) => bytes.push(value as u8),
        }
    }
    bytes
}

/// Writes `bytes` into user memory, stopping after a terminator or at the
/// first faulting address. Returns the count written before any terminator.
fn copy_to_user(machine: &mut dyn Machine, addr: i32, bytes: &[u8]) -> usize {
    for (offset, &byte) in bytes.iter().enumerate() {
        if !machine.write_mem(addr.wrapping_add(offset as i32), 1, byte as i32) || byte == 0 {
            return offset;
        }
    }
    bytes.len()
}
