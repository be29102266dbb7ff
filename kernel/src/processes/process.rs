use crate::{
    machine::{Machine, UnitEntry, UnitId},
    memory::FrameAllocator,
    processes::address_space::AddressSpace,
};
use alloc::{collections::BTreeMap, string::String, sync::Arc};
use core::sync::atomic::{AtomicU32, Ordering};
use spin::{Mutex, Once, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    New,
    Ready,
    Running,
    Blocked,
    Terminated,
}

/// Per-unit bookkeeping: the unit's address space and its exit signal.
#[derive(Debug)]
pub struct Pcb {
    pub pid: UnitId,
    /// Unit that launched this one; `None` for the bootstrap unit.
    pub parent: Option<UnitId>,
    pub name: String,
    pub path: String,
    state: Mutex<ProcessState>,
    space: Mutex<Option<AddressSpace>>,
    exit_status: Once<i32>,
}

impl Pcb {
    pub fn new(
        pid: UnitId,
        parent: Option<UnitId>,
        name: String,
        path: String,
        space: AddressSpace,
    ) -> Self {
        Self {
            pid,
            parent,
            name,
            path,
            state: Mutex::new(ProcessState::New),
            space: Mutex::new(Some(space)),
            exit_status: Once::new(),
        }
    }

    pub fn state(&self) -> ProcessState {
        *self.state.lock()
    }

    pub fn set_state(&self, state: ProcessState) {
        *self.state.lock() = state;
    }

    /// Status passed to `Exit`, once the unit has exited.
    pub fn exit_status(&self) -> Option<i32> {
        self.exit_status.get().copied()
    }

    pub fn has_space(&self) -> bool {
        self.space.lock().is_some()
    }

    /// Runs `f` against the address space, if the unit still has one.
    pub fn with_space<F, R>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut AddressSpace) -> R,
    {
        self.space.lock().as_mut().map(f)
    }

    /// Records the exit status and returns the unit's frames. Only the first
    /// call has any effect; returns whether this call was it.
    pub fn terminate(&self, status: i32, allocator: &FrameAllocator) -> bool {
        let mut first = false;
        self.exit_status.call_once(|| {
            first = true;
            status
        });
        if !first {
            return false;
        }

        if let Some(space) = self.space.lock().take() {
            space.release(allocator);
        }
        self.set_state(ProcessState::Terminated);
        true
    }
}

/// Entry routine handed to the scheduler: install the unit's registers and
/// translation, then resume user execution.
pub fn unit_entry(pcb: Arc<Pcb>) -> UnitEntry {
    alloc::boxed::Box::new(move |machine: &mut dyn Machine| {
        let started = pcb.with_space(|space| {
            space.init_registers(machine);
            space.restore_state(machine);
        });
        if started.is_none() {
            log::warn!("unit {} ({}) has no address space, not starting", pcb.name, pcb.pid);
            return;
        }

        pcb.set_state(ProcessState::Running);
        machine.run();
    })
}

/// All live and exited-but-unjoined units.
#[derive(Debug)]
pub struct ProcessTable {
    table: RwLock<BTreeMap<UnitId, Arc<Pcb>>>,
    next_pid: AtomicU32,
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTable {
    pub fn new() -> Self {
        Self {
            table: RwLock::new(BTreeMap::new()),
            next_pid: AtomicU32::new(1),
        }
    }

    pub fn allocate_pid(&self) -> UnitId {
        self.next_pid.fetch_add(1, Ordering::SeqCst)
    }

    pub fn insert(&self, pcb: Pcb) -> Arc<Pcb> {
        let pcb = Arc::new(pcb);
        self.table.write().insert(pcb.pid, Arc::clone(&pcb));
        pcb
    }

    pub fn get(&self, pid: UnitId) -> Option<Arc<Pcb>> {
        self.table.read().get(&pid).cloned()
    }

    pub fn remove(&self, pid: UnitId) -> Option<Arc<Pcb>> {
        self.table.write().remove(&pid)
    }

    /// Drops the exited children of `parent`; nobody is left to join them.
    /// Returns how many entries went.
    pub fn remove_exited_children(&self, parent: UnitId) -> usize {
        let mut table = self.table.write();
        let before = table.len();
        table.retain(|_, pcb| pcb.parent != Some(parent) || pcb.exit_status().is_none());
        before - table.len()
    }

    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.read().is_empty()
    }

    pub fn log_process_table(&self) {
        let table = self.table.read();
        log::debug!("process table: {} entries", table.len());
        for (pid, pcb) in table.iter() {
            log::debug!(
                "  PID {}: {} ({}), state {:?}, exit {:?}",
                pid,
                pcb.name,
                pcb.path,
                pcb.state(),
                pcb.exit_status()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::KernelConfig,
        testing::{executable, MockMachine},
    };
    use alloc::{string::ToString, vec};

    fn pcb(allocator: &FrameAllocator, pid: UnitId, parent: Option<UnitId>) -> Pcb {
        let config = KernelConfig::default();
        let mut memory = vec![0; config.memory_size()];
        let mut file = executable(&[7; 16], &[], 0);
        let space = AddressSpace::build(&mut file, allocator, &mut memory, &config).unwrap();
        Pcb::new(pid, parent, "unit".to_string(), "prog".to_string(), space)
    }

    #[test]
    fn test_terminate_releases_frames_once() {
        let allocator = FrameAllocator::new(32);
        let pcb = pcb(&allocator, 1, None);
        assert_eq!(allocator.count_free(), 32 - 9);

        assert!(pcb.terminate(3, &allocator));
        assert_eq!(pcb.exit_status(), Some(3));
        assert_eq!(pcb.state(), ProcessState::Terminated);
        assert_eq!(allocator.count_free(), 32);
        assert!(!pcb.has_space());

        assert!(!pcb.terminate(4, &allocator));
        assert_eq!(pcb.exit_status(), Some(3));
    }

    #[test]
    fn test_table_insert_get_remove() {
        let allocator = FrameAllocator::new(32);
        let table = ProcessTable::new();
        let pid = table.allocate_pid();
        assert_eq!(pid, 1);
        assert_eq!(table.allocate_pid(), 2);

        table.insert(pcb(&allocator, pid, None));
        assert_eq!(table.get(pid).map(|p| p.pid), Some(pid));
        assert_eq!(table.len(), 1);
        assert!(table.remove(pid).is_some());
        assert!(table.get(pid).is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn test_remove_exited_children() {
        let allocator = FrameAllocator::new(32);
        let table = ProcessTable::new();
        let exited = table.insert(pcb(&allocator, 2, Some(1)));
        table.insert(pcb(&allocator, 3, Some(1)));
        table.insert(pcb(&allocator, 1, None)).terminate(0, &allocator);
        exited.terminate(5, &allocator);

        assert_eq!(table.remove_exited_children(1), 1);
        assert!(table.get(2).is_none());
        // still running, and the exited parent itself is not its own child
        assert!(table.get(3).is_some());
        assert!(table.get(1).is_some());
        table.log_process_table();
    }

    #[test]
    fn test_entry_installs_space_and_runs() {
        let allocator = FrameAllocator::new(32);
        let pcb = Arc::new(pcb(&allocator, 5, None));
        let mut machine = MockMachine::new(&KernelConfig::default());

        unit_entry(Arc::clone(&pcb))(&mut machine);

        assert_eq!(pcb.state(), ProcessState::Running);
        assert_eq!(machine.runs, 1);
        assert_eq!(machine.translation.len(), 9);
        assert_eq!(machine.read_register(crate::constants::registers::PC_REG), 0);
    }
}
