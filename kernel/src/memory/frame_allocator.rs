use crate::memory::{bitmap_frame_allocator::FrameBitmap, placement::PlacementStrategy};
use alloc::sync::Arc;
use core::ops::Range;
use spin::Mutex;

/// Why a contiguous reservation was refused. Always recoverable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ReserveError {
    #[error("{requested} frames requested but physical memory only has {total}")]
    TooLarge { requested: usize, total: usize },
    #[error("{requested} frames requested but only {free} are free")]
    OutOfMemory { requested: usize, free: usize },
    #[error("no contiguous run of {requested} frames ({free} free in total)")]
    NoContiguousRegion { requested: usize, free: usize },
}

/// A contiguous run of frames granted by [`FrameAllocator::reserve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRange {
    pub base: usize,
    pub count: usize,
}

impl FrameRange {
    pub fn frames(&self) -> Range<usize> {
        self.base..self.base + self.count
    }
}

/// Shared handle to the kernel's frame bitmap.
///
/// Clones refer to the same bitmap; every check-select-mark sequence runs
/// under one lock so two reservations never interleave.
#[derive(Clone)]
pub struct FrameAllocator {
    bitmap: Arc<Mutex<FrameBitmap>>,
    first_fit_boundary: Option<usize>,
}

impl FrameAllocator {
    pub fn new(total_frames: usize) -> Self {
        Self::from_bitmap(FrameBitmap::new(total_frames))
    }

    pub fn from_bitmap(bitmap: FrameBitmap) -> Self {
        Self {
            bitmap: Arc::new(Mutex::new(bitmap)),
            first_fit_boundary: None,
        }
    }

    pub fn with_first_fit_boundary(mut self, boundary: Option<usize>) -> Self {
        self.first_fit_boundary = boundary;
        self
    }

    pub fn total_frames(&self) -> usize {
        self.bitmap.lock().total_frames()
    }

    pub fn count_free(&self) -> usize {
        self.bitmap.lock().count_free()
    }

    /// Reserves `pages` contiguous frames chosen by `strategy` and marks them used.
    ///
    /// Nothing is marked unless the whole run is granted.
    pub fn reserve(
        &self,
        pages: usize,
        strategy: PlacementStrategy,
    ) -> Result<FrameRange, ReserveError> {
        let mut bitmap = self.bitmap.lock();

        let total = bitmap.total_frames();
        if pages > total {
            return Err(ReserveError::TooLarge {
                requested: pages,
                total,
            });
        }

        let free = bitmap.count_free();
        if free < pages {
            return Err(ReserveError::OutOfMemory {
                requested: pages,
                free,
            });
        }

        let base = strategy
            .find(&bitmap, pages, self.first_fit_boundary)
            .ok_or(ReserveError::NoContiguousRegion {
                requested: pages,
                free,
            })?;

        bitmap.mark_range(base, pages);
        log::debug!(
            "{:?} reserved frames {}..{}, memory map now {}",
            strategy,
            base,
            base + pages,
            *bitmap
        );

        Ok(FrameRange { base, count: pages })
    }

    /// Returns a reserved range to the pool.
    ///
    /// Releasing a frame that is not marked used is a contract violation.
    pub fn release(&self, range: FrameRange) {
        let mut bitmap = self.bitmap.lock();
        for frame_index in range.frames() {
            assert!(
                bitmap.test(frame_index),
                "releasing frame {} which is not in use",
                frame_index
            );
            bitmap.clear(frame_index);
        }
        log::debug!(
            "released frames {}..{}, memory map now {}",
            range.base,
            range.base + range.count,
            *bitmap
        );
    }

    /// Runs `f` with exclusive access to the bitmap.
    pub fn with_bitmap<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut FrameBitmap) -> R,
    {
        let mut guard = self.bitmap.lock();
        f(&mut guard)
    }
}
