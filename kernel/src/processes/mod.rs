pub mod address_space;
pub mod loader;
pub mod process;
pub mod registers;

pub use address_space::{AddressSpace, EntryFlags, TranslationEntry};
pub use loader::{LoadError, NoffHeader, Segment};
pub use process::{Pcb, ProcessState, ProcessTable};
pub use registers::UserRegisters;
