//! Test doubles for the machine-side capabilities and an executable builder.

use crate::{
    config::KernelConfig,
    constants::{processes::MAIN_UNIT_NAME, registers::NUM_TOTAL_REGS},
    devices::console::BufferedConsole,
    filesys::memory::{MemoryFile, MemoryFileSystem},
    machine::{ByteStreams, IntLevel, Interrupt, Machine, Scheduler, TrapContext, UnitEntry, UnitId},
    processes::{
        address_space::{EntryFlags, TranslationEntry},
        loader::{NoffHeader, Segment, NOFF_HEADER_SIZE},
    },
};
use alloc::{
    boxed::Box,
    collections::BTreeMap,
    string::{String, ToString},
    vec,
    vec::Vec,
};

/// NOFF image with the code segment right after the header and the data
/// segment right after the code.
pub fn executable(code: &[u8], data: &[u8], uninit_size: u32) -> MemoryFile {
    let code_at = NOFF_HEADER_SIZE as u32;
    let data_at = code_at + code.len() as u32;
    let header = NoffHeader::new(
        Segment {
            size: code.len() as u32,
            virtual_addr: 0,
            in_file_addr: code_at,
        },
        Segment {
            size: data.len() as u32,
            virtual_addr: code.len() as u32,
            in_file_addr: data_at,
        },
        Segment {
            size: uninit_size,
            virtual_addr: (code.len() + data.len()) as u32,
            in_file_addr: 0,
        },
    );

    let mut bytes = header.encode().to_vec();
    bytes.extend_from_slice(code);
    bytes.extend_from_slice(data);
    MemoryFile::new(bytes)
}

/// Register file plus main memory. Until a translation is installed every
/// virtual page maps to the physical frame of the same number.
pub struct MockMachine {
    pub registers: [i32; NUM_TOTAL_REGS],
    pub memory: Vec<u8>,
    pub translation: Vec<TranslationEntry>,
    pub runs: usize,
    page_size: usize,
}

impl MockMachine {
    pub fn new(config: &KernelConfig) -> Self {
        let translation = (0..config.num_phys_pages)
            .map(|page| TranslationEntry {
                virtual_page: page,
                physical_page: page,
                flags: EntryFlags::VALID,
            })
            .collect();
        Self {
            registers: [0; NUM_TOTAL_REGS],
            memory: vec![0; config.memory_size()],
            translation,
            runs: 0,
            page_size: config.page_size,
        }
    }

    fn translate(&self, addr: i32, size: usize, writing: bool) -> Option<usize> {
        let addr = usize::try_from(addr).ok()?;
        let entry = self
            .translation
            .iter()
            .find(|entry| entry.virtual_page == addr / self.page_size && entry.is_valid())?;
        if writing && entry.is_read_only() {
            return None;
        }
        let physical = entry.physical_page * self.page_size + addr % self.page_size;
        (physical + size <= self.memory.len()).then_some(physical)
    }
}

impl Machine for MockMachine {
    fn read_register(&self, reg: usize) -> i32 {
        self.registers[reg]
    }

    fn write_register(&mut self, reg: usize, value: i32) {
        self.registers[reg] = value;
    }

    fn read_mem(&mut self, addr: i32, size: usize) -> Option<i32> {
        let at = self.translate(addr, size, false)?;
        let mut raw = [0u8; 4];
        raw[..size].copy_from_slice(&self.memory[at..at + size]);
        Some(i32::from_le_bytes(raw))
    }

    fn write_mem(&mut self, addr: i32, size: usize, value: i32) -> bool {
        match self.translate(addr, size, true) {
            Some(at) => {
                self.memory[at..at + size].copy_from_slice(&value.to_le_bytes()[..size]);
                true
            }
            None => false,
        }
    }

    fn main_memory(&mut self) -> &mut [u8] {
        &mut self.memory
    }

    fn install_translation(&mut self, table: &[TranslationEntry]) {
        self.translation = table.to_vec();
    }

    fn run(&mut self) {
        self.runs += 1;
    }
}

pub struct MockScheduler {
    pub current: UnitId,
    pub name: String,
    pub forked: Vec<(UnitId, String, UnitEntry)>,
    pub yields: usize,
    pub finished: usize,
    yield_hook: Option<Box<dyn FnMut()>>,
}

impl MockScheduler {
    pub fn new() -> Self {
        Self {
            current: 0,
            name: MAIN_UNIT_NAME.to_string(),
            forked: Vec::new(),
            yields: 0,
            finished: 0,
            yield_hook: None,
        }
    }

    /// Runs `hook` every time the current unit yields, standing in for the
    /// other units getting the processor.
    pub fn set_yield_hook(&mut self, hook: impl FnMut() + 'static) {
        self.yield_hook = Some(Box::new(hook));
    }
}

impl Scheduler for MockScheduler {
    fn current(&self) -> UnitId {
        self.current
    }

    fn current_name(&self) -> &str {
        &self.name
    }

    fn fork(&mut self, unit: UnitId, name: &str, entry: UnitEntry) {
        self.forked.push((unit, name.to_string(), entry));
    }

    fn yield_now(&mut self) {
        self.yields += 1;
        assert!(self.yields < 10_000, "unit never got past its yield loop");
        if let Some(hook) = self.yield_hook.as_mut() {
            hook();
        }
    }

    fn finish(&mut self) {
        self.finished += 1;
    }
}

pub struct MockInterrupt {
    pub level: IntLevel,
    pub level_changes: usize,
    pub halted: bool,
}

impl Interrupt for MockInterrupt {
    fn set_level(&mut self, level: IntLevel) -> IntLevel {
        self.level_changes += 1;
        core::mem::replace(&mut self.level, level)
    }

    fn halt(&mut self) {
        self.halted = true;
    }
}

#[derive(Default)]
pub struct MockStreams {
    /// Longest buffer any `read` was handed.
    pub largest_read: usize,
    input: BTreeMap<i32, Vec<u8>>,
    output: BTreeMap<i32, Vec<u8>>,
}

impl MockStreams {
    pub fn feed(&mut self, stream: i32, bytes: &[u8]) {
        self.input.entry(stream).or_default().extend_from_slice(bytes);
    }

    pub fn written(&self, stream: i32) -> &[u8] {
        self.output.get(&stream).map(Vec::as_slice).unwrap_or_default()
    }
}

impl ByteStreams for MockStreams {
    fn read(&mut self, stream: i32, buf: &mut [u8]) -> usize {
        self.largest_read = self.largest_read.max(buf.len());
        let pending = self.input.entry(stream).or_default();
        let count = buf.len().min(pending.len());
        buf[..count].copy_from_slice(&pending[..count]);
        pending.drain(..count);
        count
    }

    fn write(&mut self, stream: i32, buf: &[u8]) -> usize {
        self.output.entry(stream).or_default().extend_from_slice(buf);
        buf.len()
    }
}

/// One of each capability, owned, so a test can hand out a [`TrapContext`].
pub struct Harness {
    pub machine: MockMachine,
    pub scheduler: MockScheduler,
    pub interrupt: MockInterrupt,
    pub files: MemoryFileSystem,
    pub console: BufferedConsole,
    pub streams: MockStreams,
}

impl Harness {
    pub fn new(config: &KernelConfig) -> Self {
        Self {
            machine: MockMachine::new(config),
            scheduler: MockScheduler::new(),
            interrupt: MockInterrupt {
                level: IntLevel::On,
                level_changes: 0,
                halted: false,
            },
            files: MemoryFileSystem::new(),
            console: BufferedConsole::new(8),
            streams: MockStreams::default(),
        }
    }

    pub fn ctx(&mut self) -> TrapContext<'_> {
        TrapContext {
            machine: &mut self.machine,
            scheduler: &mut self.scheduler,
            interrupt: &mut self.interrupt,
            files: &mut self.files,
            console: &mut self.console,
            streams: &mut self.streams,
        }
    }

    /// Stores `s` and its terminator at virtual `addr`.
    pub fn write_user_str(&mut self, addr: i32, s: &str) {
        for (offset, &byte) in s.as_bytes().iter().chain([0u8].iter()).enumerate() {
            assert!(self.machine.write_mem(addr + offset as i32, 1, byte as i32));
        }
    }

    pub fn read_user_bytes(&mut self, addr: i32, len: usize) -> Vec<u8> {
        (0..len)
            .map(|offset| {
                self.machine
                    .read_mem(addr + offset as i32, 1)
                    .map(|byte| byte as u8)
                    .unwrap_or_default()
            })
            .collect()
    }
}
