//! User address spaces.
//!
//! An address space is one contiguous run of physical frames, mapped 1:1 from
//! virtual page `x` to frame `base + x`, holding the program image followed by
//! zero-filled uninitialized data and the user stack.

use crate::{
    config::KernelConfig,
    constants::{
        processes::INSTRUCTION_WIDTH,
        registers::{NEXT_PC_REG, PC_REG, STACK_REG},
    },
    filesys::OpenFile,
    machine::Machine,
    memory::{FrameAllocator, FrameRange},
    processes::{
        loader::{LoadError, NoffHeader, Segment},
        registers::UserRegisters,
    },
};
use alloc::vec::Vec;
use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EntryFlags: u8 {
        const VALID = 1 << 0;
        /// Set by the machine on any access.
        const USE = 1 << 1;
        /// Set by the machine on a write.
        const DIRTY = 1 << 2;
        const READ_ONLY = 1 << 3;
    }
}

/// One virtual-page-to-frame mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranslationEntry {
    pub virtual_page: usize,
    pub physical_page: usize,
    pub flags: EntryFlags,
}

impl TranslationEntry {
    pub fn is_valid(&self) -> bool {
        self.flags.contains(EntryFlags::VALID)
    }

    pub fn is_read_only(&self) -> bool {
        self.flags.contains(EntryFlags::READ_ONLY)
    }
}

/// Pages needed for an image of `image_size` bytes plus the user stack.
pub fn pages_needed(image_size: usize, config: &KernelConfig) -> usize {
    (image_size + config.user_stack_size).div_ceil(config.page_size)
}

#[derive(Debug)]
pub struct AddressSpace {
    page_table: Vec<TranslationEntry>,
    frames: FrameRange,
    page_size: usize,
    stack_margin: usize,
}

impl AddressSpace {
    /// Loads `executable` into a fresh run of frames.
    ///
    /// Frames are reserved from `allocator` in one atomic step before any
    /// byte is copied; if copying fails they are handed back.
    pub fn build(
        executable: &mut dyn OpenFile,
        allocator: &FrameAllocator,
        main_memory: &mut [u8],
        config: &KernelConfig,
    ) -> Result<Self, LoadError> {
        let header = NoffHeader::read_from(executable)?;

        let pages = pages_needed(header.image_size(), config);
        let total = allocator.total_frames();
        if pages > total {
            return Err(LoadError::TooLarge { pages, total });
        }

        log::debug!(
            "initializing address space, num pages {}, size {}",
            pages,
            pages * config.page_size
        );

        let frames = allocator.reserve(pages, config.placement)?;

        let page_table = frames
            .frames()
            .enumerate()
            .map(|(virtual_page, physical_page)| TranslationEntry {
                virtual_page,
                physical_page,
                flags: EntryFlags::VALID,
            })
            .collect();

        let space = Self {
            page_table,
            frames,
            page_size: config.page_size,
            stack_margin: config.stack_margin,
        };

        if let Err(err) = space.load_image(executable, &header, main_memory) {
            allocator.release(frames);
            return Err(err);
        }

        Ok(space)
    }

    // Zero every frame, then copy code and initialized data back to back from
    // the start of the base frame.
    fn load_image(
        &self,
        executable: &mut dyn OpenFile,
        header: &NoffHeader,
        main_memory: &mut [u8],
    ) -> Result<(), LoadError> {
        let start = self.base_offset();
        let region = &mut main_memory[start..start + self.size()];
        region.fill(0);

        let mut offset = 0;
        for (name, segment) in [("code", &header.code), ("data", &header.init_data)] {
            offset += self.copy_segment(executable, name, segment, &mut region[offset..])?;
        }
        Ok(())
    }

    fn copy_segment(
        &self,
        executable: &mut dyn OpenFile,
        name: &str,
        segment: &Segment,
        dest: &mut [u8],
    ) -> Result<usize, LoadError> {
        let size = segment.size as usize;
        if size == 0 {
            return Ok(0);
        }

        log::debug!(
            "initializing {} segment, at {:#x}, size {}",
            name,
            segment.virtual_addr,
            size
        );
        executable
            .read_exact_at(&mut dest[..size], segment.in_file_addr as usize)
            .map_err(LoadError::ShortRead)?;
        Ok(size)
    }

    pub fn page_table(&self) -> &[TranslationEntry] {
        &self.page_table
    }

    pub fn page_count(&self) -> usize {
        self.page_table.len()
    }

    pub fn frames(&self) -> FrameRange {
        self.frames
    }

    pub fn base_frame(&self) -> usize {
        self.frames.base
    }

    /// Byte offset of the base frame in main memory.
    pub fn base_offset(&self) -> usize {
        self.frames.base * self.page_size
    }

    pub fn size(&self) -> usize {
        self.page_count() * self.page_size
    }

    /// Register image a unit starts from: PC at the base frame, stack just
    /// under the top of the space, everything else zero.
    pub fn initial_registers(&self) -> UserRegisters {
        let base = self.base_offset() as i32;
        let mut regs = UserRegisters::new();
        regs.set(PC_REG, base);
        regs.set(NEXT_PC_REG, base + INSTRUCTION_WIDTH);
        regs.set(STACK_REG, base + (self.size() - self.stack_margin) as i32);
        regs
    }

    pub fn init_registers(&self, machine: &mut dyn Machine) {
        let regs = self.initial_registers();
        log::debug!("initializing registers {:?}", regs);
        regs.load_into(machine);
    }

    /// Context-switch hook; nothing here outlives the machine's own registers.
    pub fn save_state(&mut self, _machine: &mut dyn Machine) {}

    /// Context-switch hook: installs this space's translation.
    pub fn restore_state(&self, machine: &mut dyn Machine) {
        machine.install_translation(&self.page_table);
    }

    /// Returns this space's frames to `allocator`.
    pub fn release(self, allocator: &FrameAllocator) {
        allocator.release(self.frames);
    }
}
