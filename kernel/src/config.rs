//! Runtime kernel configuration.
//!
//! The defaults reproduce the reference machine: 32 frames of 128 bytes, a
//! 1 KiB user stack and first-fit placement.

use crate::{
    constants::{
        memory::{NUM_PHYS_PAGES, PAGE_SIZE},
        processes::{STACK_SAFETY_MARGIN, USER_STACK_SIZE},
    },
    memory::placement::PlacementStrategy,
};

/// How `Join` treats its handle argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinPolicy {
    /// Block (cooperatively) until the named unit exits, then return its status.
    WaitForExit,
    /// Relaunch the path used by the most recent `Exec` and return 0 immediately.
    RelaunchLastPath,
}

/// What happens when a unit raises a non-syscall exception.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPolicy {
    /// The faulting unit exits with status -1 and its frames are released.
    TerminateUnit,
    /// Fatal for the `main` unit, ignored for everyone else.
    Legacy,
}

#[derive(Debug, Clone)]
pub struct KernelConfig {
    pub num_phys_pages: usize,
    pub page_size: usize,
    pub user_stack_size: usize,
    pub stack_margin: usize,
    pub placement: PlacementStrategy,
    /// Forces a first-fit run boundary at every multiple of this many frames.
    pub first_fit_boundary: Option<usize>,
    pub join_policy: JoinPolicy,
    pub fault_policy: FaultPolicy,
}

impl KernelConfig {
    pub fn memory_size(&self) -> usize {
        self.num_phys_pages * self.page_size
    }

    pub fn with_placement(mut self, placement: PlacementStrategy) -> Self {
        self.placement = placement;
        self
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            num_phys_pages: NUM_PHYS_PAGES,
            page_size: PAGE_SIZE,
            user_stack_size: USER_STACK_SIZE,
            stack_margin: STACK_SAFETY_MARGIN,
            placement: PlacementStrategy::FirstFit,
            first_fit_boundary: None,
            join_policy: JoinPolicy::WaitForExit,
            fault_policy: FaultPolicy::TerminateUnit,
        }
    }
}
