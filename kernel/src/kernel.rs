//! Kernel state shared by every trap: the frame allocator, the process table
//! and the path of the most recent launch.

use crate::{
    config::{JoinPolicy, KernelConfig},
    constants::processes::MAIN_UNIT_NAME,
    machine::{without_interrupts, Machine, TrapContext, UnitId},
    memory::{FrameAllocator, FrameBitmap},
    processes::{
        address_space::AddressSpace,
        process::{unit_entry, Pcb, ProcessState, ProcessTable},
    },
    syscalls::ExecError,
};
use alloc::string::{String, ToString};
use spin::{Mutex, Once};

pub struct Kernel {
    config: KernelConfig,
    allocator: FrameAllocator,
    processes: ProcessTable,
    last_exec_path: Mutex<Option<String>>,
    main_unit: Once<UnitId>,
}

impl Kernel {
    /// Kernel with every frame free.
    pub fn new(config: KernelConfig) -> Self {
        let bitmap = FrameBitmap::new(config.num_phys_pages);
        Self::with_bitmap(config, bitmap)
    }

    /// Kernel starting from an existing bitmap, e.g. one fetched from a backing store.
    pub fn with_bitmap(config: KernelConfig, bitmap: FrameBitmap) -> Self {
        assert_eq!(
            bitmap.total_frames(),
            config.num_phys_pages,
            "bitmap size does not match physical memory"
        );
        let allocator =
            FrameAllocator::from_bitmap(bitmap).with_first_fit_boundary(config.first_fit_boundary);
        Self {
            config,
            allocator,
            processes: ProcessTable::new(),
            last_exec_path: Mutex::new(None),
            main_unit: Once::new(),
        }
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn allocator(&self) -> &FrameAllocator {
        &self.allocator
    }

    pub fn processes(&self) -> &ProcessTable {
        &self.processes
    }

    pub fn last_exec_path(&self) -> Option<String> {
        self.last_exec_path.lock().clone()
    }

    /// Unit created by the first successful bootstrap launch.
    pub fn main_unit(&self) -> Option<UnitId> {
        self.main_unit.get().copied()
    }

    /// Bootstrap launch of a user program as a `main` unit with no parent.
    pub fn start_process(&self, path: &str, ctx: &mut TrapContext<'_>) -> Result<UnitId, ExecError> {
        let pid = self.launch(path, MAIN_UNIT_NAME, None, ctx)?;
        self.main_unit.call_once(|| pid);
        Ok(pid)
    }

    /// Opens `path`, builds its address space and hands a new unit to the
    /// scheduler.
    pub(crate) fn launch(
        &self,
        path: &str,
        name: &str,
        parent: Option<UnitId>,
        ctx: &mut TrapContext<'_>,
    ) -> Result<UnitId, ExecError> {
        let mut executable = ctx.files.open(path).map_err(|source| ExecError::Open {
            path: path.to_string(),
            source,
        })?;

        self.allocator
            .with_bitmap(|bitmap| log::debug!("memory map before load: {}", bitmap));
        let space = AddressSpace::build(
            executable.as_mut(),
            &self.allocator,
            ctx.machine.main_memory(),
            &self.config,
        )
        .map_err(|source| ExecError::Load {
            path: path.to_string(),
            source,
        })?;
        drop(executable);

        let pid = self.processes.allocate_pid();
        log::info!(
            "launching {} as unit {} ({}) in frames {:?}",
            path,
            pid,
            name,
            space.frames().frames()
        );
        let pcb = self.processes.insert(Pcb::new(
            pid,
            parent,
            name.to_string(),
            path.to_string(),
            space,
        ));
        pcb.set_state(ProcessState::Ready);
        *self.last_exec_path.lock() = Some(path.to_string());

        let entry = unit_entry(pcb);
        let scheduler = &mut *ctx.scheduler;
        without_interrupts(&mut *ctx.interrupt, || scheduler.fork(pid, name, entry));

        Ok(pid)
    }

    /// Marks `pid` exited with `status` and returns its frames.
    ///
    /// The entry stays in the table only while a `Join` can still collect it:
    /// under [`JoinPolicy::WaitForExit`] that is as long as its parent is
    /// alive. Exited children of `pid` are dropped with it.
    pub fn terminate(&self, pid: UnitId, status: i32) -> bool {
        let pcb = match self.processes.get(pid) {
            Some(pcb) => pcb,
            None => return false,
        };
        if !pcb.terminate(status, &self.allocator) {
            return false;
        }

        let orphans = self.processes.remove_exited_children(pid);
        if orphans > 0 {
            log::debug!("dropped {} unjoined children of unit {}", orphans, pid);
        }
        if !self.joinable(&pcb) {
            self.processes.remove(pid);
        }
        self.processes.log_process_table();
        true
    }

    fn joinable(&self, pcb: &Pcb) -> bool {
        match self.config.join_policy {
            JoinPolicy::RelaunchLastPath => false,
            JoinPolicy::WaitForExit => pcb
                .parent
                .and_then(|parent| self.processes.get(parent))
                .is_some_and(|parent| parent.exit_status().is_none()),
        }
    }

    /// Context-switch hook for the scheduler: save `from`'s state and install `to`'s.
    pub fn switch_to(&self, from: Option<UnitId>, to: UnitId, machine: &mut dyn Machine) {
        if let Some(pcb) = from.and_then(|pid| self.processes.get(pid)) {
            pcb.with_space(|space| space.save_state(machine));
        }
        if let Some(pcb) = self.processes.get(to) {
            pcb.with_space(|space| space.restore_state(machine));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{executable, Harness};

    fn two_units() -> (Kernel, Harness, UnitId, UnitId) {
        let config = KernelConfig::default();
        let mut harness = Harness::new(&config);
        harness
            .files
            .insert("prog", executable(&[1; 100], &[2; 50], 30).contents().to_vec());
        let kernel = Kernel::new(config);
        let a = kernel.start_process("prog", &mut harness.ctx()).unwrap();
        let b = kernel.start_process("prog", &mut harness.ctx()).unwrap();
        (kernel, harness, a, b)
    }

    #[test]
    fn test_switch_installs_incoming_translation() {
        let (kernel, mut harness, a, b) = two_units();

        kernel.switch_to(None, a, &mut harness.machine);
        assert_eq!(harness.machine.translation.len(), 10);
        assert_eq!(harness.machine.translation[0].physical_page, 0);

        kernel.switch_to(Some(a), b, &mut harness.machine);
        assert_eq!(harness.machine.translation.len(), 10);
        let frames: alloc::vec::Vec<usize> = harness
            .machine
            .translation
            .iter()
            .map(|entry| entry.physical_page)
            .collect();
        assert_eq!(frames, (10..20).collect::<alloc::vec::Vec<_>>());
    }

    #[test]
    fn test_switch_to_unknown_unit_keeps_translation() {
        let (kernel, mut harness, a, _) = two_units();
        kernel.switch_to(None, a, &mut harness.machine);
        let before = harness.machine.translation.clone();

        kernel.switch_to(Some(a), 99, &mut harness.machine);
        assert_eq!(harness.machine.translation, before);
    }

    #[test]
    fn test_only_first_bootstrap_is_main() {
        let (kernel, _, a, b) = two_units();
        assert_ne!(a, b);
        assert_eq!(kernel.main_unit(), Some(a));
    }
}
