use crate::{
    constants::memory::{BitmapWord, BITMAP_ENTRY_SIZE, BITMAP_WORD_BYTES},
    filesys::{FsError, OpenFile},
};
use core::fmt;

use alloc::{boxed::Box, vec, vec::Vec};

/// One bit per physical frame, `0` = free.
#[derive(Clone, PartialEq, Eq)]
pub struct FrameBitmap {
    total_frames: usize,
    bitmap: Box<[BitmapWord]>,
}

impl FrameBitmap {
    /// Creates a bitmap of `total_frames` bits, all clear.
    pub fn new(total_frames: usize) -> Self {
        let bitmap_size = total_frames.div_ceil(BITMAP_ENTRY_SIZE);
        Self {
            total_frames,
            bitmap: vec![0; bitmap_size].into_boxed_slice(),
        }
    }

    pub fn total_frames(&self) -> usize {
        self.total_frames
    }

    /// Mark a specific frame as used (1).
    pub fn mark(&mut self, frame_index: usize) {
        let (word, mask) = self.locate(frame_index);
        self.bitmap[word] |= mask;
    }

    /// Mark a specific frame as free (0).
    pub fn clear(&mut self, frame_index: usize) {
        let (word, mask) = self.locate(frame_index);
        self.bitmap[word] &= !mask;
    }

    /// check if bit is set at frame_index. returns true if bit == 1, false otherwise
    pub fn test(&self, frame_index: usize) -> bool {
        let (word, mask) = self.locate(frame_index);
        (self.bitmap[word] & mask) != 0
    }

    fn locate(&self, frame_index: usize) -> (usize, BitmapWord) {
        assert!(
            frame_index < self.total_frames,
            "frame index {} out of range (bitmap has {} frames)",
            frame_index,
            self.total_frames
        );

        let word_index = frame_index / BITMAP_ENTRY_SIZE;
        let bit_index = frame_index % BITMAP_ENTRY_SIZE;

        (word_index, 1 << bit_index)
    }

    /// Number of clear bits, by linear scan.
    pub fn count_free(&self) -> usize {
        (0..self.total_frames).filter(|&i| !self.test(i)).count()
    }

    /// Finds the first clear bit, marks it and returns its index.
    pub fn find_first_free(&mut self) -> Option<usize> {
        let frame_index = (0..self.total_frames).find(|&i| !self.test(i))?;
        self.mark(frame_index);
        Some(frame_index)
    }

    /// Marks `[start, start + len)` used.
    pub fn mark_range(&mut self, start: usize, len: usize) {
        for frame_index in start..start + len {
            self.mark(frame_index);
        }
    }

    /// Marks `[start, start + len)` free.
    pub fn clear_range(&mut self, start: usize, len: usize) {
        for frame_index in start..start + len {
            self.clear(frame_index);
        }
    }

    /// Size in bytes of the persisted record.
    pub fn storage_len(&self) -> usize {
        self.bitmap.len() * BITMAP_WORD_BYTES
    }

    /// Replaces the whole bitmap with the record stored at offset 0 of `file`.
    pub fn fetch_from(&mut self, file: &mut dyn OpenFile) -> Result<(), FsError> {
        let mut raw = vec![0u8; self.storage_len()];
        file.read_exact_at(&mut raw, 0)?;

        for (word, bytes) in self
            .bitmap
            .iter_mut()
            .zip(raw.chunks_exact(BITMAP_WORD_BYTES))
        {
            let mut le = [0u8; BITMAP_WORD_BYTES];
            le.copy_from_slice(bytes);
            *word = BitmapWord::from_le_bytes(le);
        }

        // bits past the last frame never count as used
        let tail = self.total_frames % BITMAP_ENTRY_SIZE;
        if tail != 0 {
            if let Some(last) = self.bitmap.last_mut() {
                *last &= (1 << tail) - 1;
            }
        }
        Ok(())
    }

    /// Stores the whole bitmap at offset 0 of `file`.
    pub fn write_back(&self, file: &mut dyn OpenFile) -> Result<(), FsError> {
        let raw: Vec<u8> = self.bitmap.iter().flat_map(|w| w.to_le_bytes()).collect();
        file.write_all_at(&raw, 0)
    }
}

/// Renders one `1`/`0` per frame.
impl fmt::Display for FrameBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for frame_index in 0..self.total_frames {
            if frame_index > 0 && frame_index % BITMAP_ENTRY_SIZE == 0 {
                f.write_str(" ")?;
            }
            f.write_str(if self.test(frame_index) { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl fmt::Debug for FrameBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameBitmap")
            .field("total_frames", &self.total_frames)
            .field("free", &self.count_free())
            .field("bits", &format_args!("{}", self))
            .finish()
    }
}
