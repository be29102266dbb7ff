//! Physical memory geometry.

/// Bytes per page, equal to the disk sector size of the simulated machine.
pub const PAGE_SIZE: usize = 128;

/// Number of physical frames in main memory.
pub const NUM_PHYS_PAGES: usize = 32;

/// Bitmap storage word, persisted as little-endian.
pub type BitmapWord = u32;
pub const BITMAP_ENTRY_SIZE: usize = BitmapWord::BITS as usize;
pub const BITMAP_WORD_BYTES: usize = core::mem::size_of::<BitmapWord>();
