//! Contiguous placement strategies over a [`FrameBitmap`].
//!
//! Every search here is a pure scan: it reads the bitmap, never mutates it,
//! and keeps no state between calls. Committing the chosen run is the
//! caller's job (see [`FrameAllocator::reserve`]).
//!
//! [`FrameAllocator::reserve`]: super::frame_allocator::FrameAllocator::reserve

use crate::memory::bitmap_frame_allocator::FrameBitmap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementStrategy {
    /// First run, in scan order, long enough for the request.
    FirstFit,
    /// Shortest run long enough for the request; earliest wins ties.
    BestFit,
    /// Longest run long enough for the request; earliest wins ties.
    WorstFit,
}

/// A maximal run of free frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeRun {
    pub start: usize,
    pub len: usize,
}

/// Iterator over the free runs of a bitmap, in ascending order.
///
/// A run ends at a used frame, at the end of the bitmap, or, when a boundary
/// is set, just before any frame index that is a multiple of it.
pub struct FreeRuns<'a> {
    bitmap: &'a FrameBitmap,
    next: usize,
    boundary: Option<usize>,
}

impl<'a> FreeRuns<'a> {
    pub fn new(bitmap: &'a FrameBitmap, from: usize, boundary: Option<usize>) -> Self {
        Self {
            bitmap,
            next: from,
            boundary: boundary.filter(|&b| b > 0),
        }
    }

    fn crosses_boundary(&self, frame_index: usize) -> bool {
        matches!(self.boundary, Some(b) if frame_index % b == 0)
    }
}

impl Iterator for FreeRuns<'_> {
    type Item = FreeRun;

    fn next(&mut self) -> Option<FreeRun> {
        let total = self.bitmap.total_frames();
        while self.next < total && self.bitmap.test(self.next) {
            self.next += 1;
        }
        if self.next >= total {
            return None;
        }

        let start = self.next;
        self.next += 1;
        while self.next < total && !self.bitmap.test(self.next) && !self.crosses_boundary(self.next)
        {
            self.next += 1;
        }

        Some(FreeRun {
            start,
            len: self.next - start,
        })
    }
}

impl PlacementStrategy {
    /// Picks the starting frame for `pages` contiguous frames, or `None` if no
    /// run is long enough.
    ///
    /// `boundary` only affects first-fit.
    pub fn find(self, bitmap: &FrameBitmap, pages: usize, boundary: Option<usize>) -> Option<usize> {
        match self {
            PlacementStrategy::FirstFit => first_fit(bitmap, pages, 0, boundary),
            PlacementStrategy::BestFit => best_fit(bitmap, pages),
            PlacementStrategy::WorstFit => worst_fit(bitmap, pages),
        }
    }
}

/// First run of at least `pages` frames at or after `resume`.
pub fn first_fit(
    bitmap: &FrameBitmap,
    pages: usize,
    resume: usize,
    boundary: Option<usize>,
) -> Option<usize> {
    if bitmap.count_free() < pages {
        return None;
    }

    FreeRuns::new(bitmap, resume, boundary)
        .find(|run| run.len >= pages)
        .map(|run| run.start)
}

pub fn best_fit(bitmap: &FrameBitmap, pages: usize) -> Option<usize> {
    select(bitmap, pages, |candidate, chosen| candidate.len < chosen.len)
}

pub fn worst_fit(bitmap: &FrameBitmap, pages: usize) -> Option<usize> {
    select(bitmap, pages, |candidate, chosen| candidate.len > chosen.len)
}

// Scan every fitting run; a later run replaces the current choice only when
// strictly better, so the earliest run wins ties.
fn select(
    bitmap: &FrameBitmap,
    pages: usize,
    better: impl Fn(&FreeRun, &FreeRun) -> bool,
) -> Option<usize> {
    if bitmap.count_free() < pages {
        return None;
    }

    let mut chosen: Option<FreeRun> = None;
    for run in FreeRuns::new(bitmap, 0, None).filter(|run| run.len >= pages) {
        match chosen {
            Some(ref current) if !better(&run, current) => {}
            _ => chosen = Some(run),
        }
    }
    chosen.map(|run| run.start)
}
