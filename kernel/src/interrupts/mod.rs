//! Trap entry: exception classification and the per-trap outcome.

pub mod exceptions;

pub use exceptions::ExceptionType;

/// What the caller of [`crate::kernel::Kernel::handle_exception`] does next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapOutcome {
    /// Return to the trapped unit.
    Resume,
    /// The trapped unit is gone; its thread has been retired.
    Finished,
    /// The machine has been halted.
    Halted,
}
