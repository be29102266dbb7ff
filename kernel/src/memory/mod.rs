//! Physical frame bookkeeping.

pub mod bitmap_frame_allocator;
pub mod frame_allocator;
pub mod placement;

pub use bitmap_frame_allocator::FrameBitmap;
pub use frame_allocator::{FrameAllocator, FrameRange, ReserveError};
pub use placement::PlacementStrategy;
