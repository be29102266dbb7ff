//! NOFF executable header.
//!
//! The header is ten 32-bit words: the magic tag, then `{size, virtual_addr,
//! in_file_addr}` for the code, initialized-data and uninitialized-data
//! segments. Words are stored little-endian; a file produced on a machine of
//! the other byte order is recognized by its swapped magic and normalized.

use crate::{
    constants::processes::NOFF_MAGIC,
    filesys::{FsError, OpenFile},
    memory::ReserveError,
};

pub const NOFF_HEADER_SIZE: usize = 10 * 4;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("cannot read executable header: {0}")]
    TruncatedHeader(#[source] FsError),
    #[error("bad magic number {0:#010x}")]
    BadMagic(u32),
    #[error("program needs {pages} pages but physical memory only has {total}")]
    TooLarge { pages: usize, total: usize },
    #[error("program needs {pages} pages but only {free} frames are free")]
    OutOfMemory { pages: usize, free: usize },
    #[error("no contiguous run of {pages} frames ({free} free in total)")]
    NoContiguousRegion { pages: usize, free: usize },
    #[error("cannot read segment from executable: {0}")]
    ShortRead(#[source] FsError),
}

impl From<ReserveError> for LoadError {
    fn from(err: ReserveError) -> Self {
        match err {
            ReserveError::TooLarge { requested, total } => LoadError::TooLarge {
                pages: requested,
                total,
            },
            ReserveError::OutOfMemory { requested, free } => LoadError::OutOfMemory {
                pages: requested,
                free,
            },
            ReserveError::NoContiguousRegion { requested, free } => {
                LoadError::NoContiguousRegion {
                    pages: requested,
                    free,
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Segment {
    pub size: u32,
    pub virtual_addr: u32,
    pub in_file_addr: u32,
}

impl Segment {
    fn swap_bytes(self) -> Self {
        Self {
            size: self.size.swap_bytes(),
            virtual_addr: self.virtual_addr.swap_bytes(),
            in_file_addr: self.in_file_addr.swap_bytes(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoffHeader {
    pub magic: u32,
    pub code: Segment,
    pub init_data: Segment,
    pub uninit_data: Segment,
}

impl NoffHeader {
    pub fn new(code: Segment, init_data: Segment, uninit_data: Segment) -> Self {
        Self {
            magic: NOFF_MAGIC,
            code,
            init_data,
            uninit_data,
        }
    }

    /// Reads and validates the header at offset 0 of `executable`.
    pub fn read_from(executable: &mut dyn OpenFile) -> Result<Self, LoadError> {
        let mut raw = [0u8; NOFF_HEADER_SIZE];
        executable
            .read_exact_at(&mut raw, 0)
            .map_err(LoadError::TruncatedHeader)?;
        Self::decode(&raw)
    }

    /// Decodes a raw header, swapping byte order if only the swapped magic matches.
    pub fn decode(raw: &[u8; NOFF_HEADER_SIZE]) -> Result<Self, LoadError> {
        let mut words = [0u32; 10];
        for (word, bytes) in words.iter_mut().zip(raw.chunks_exact(4)) {
            *word = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        }

        let segment = |i: usize| Segment {
            size: words[i],
            virtual_addr: words[i + 1],
            in_file_addr: words[i + 2],
        };
        let header = Self {
            magic: words[0],
            code: segment(1),
            init_data: segment(4),
            uninit_data: segment(7),
        };

        if header.magic == NOFF_MAGIC {
            Ok(header)
        } else if header.magic.swap_bytes() == NOFF_MAGIC {
            log::debug!("executable header is byte-swapped, normalizing");
            Ok(header.swap_bytes())
        } else {
            Err(LoadError::BadMagic(header.magic))
        }
    }

    /// Little-endian encoding, the inverse of [`NoffHeader::decode`].
    pub fn encode(&self) -> [u8; NOFF_HEADER_SIZE] {
        let words = [
            self.magic,
            self.code.size,
            self.code.virtual_addr,
            self.code.in_file_addr,
            self.init_data.size,
            self.init_data.virtual_addr,
            self.init_data.in_file_addr,
            self.uninit_data.size,
            self.uninit_data.virtual_addr,
            self.uninit_data.in_file_addr,
        ];
        let mut raw = [0u8; NOFF_HEADER_SIZE];
        for (bytes, word) in raw.chunks_exact_mut(4).zip(words) {
            bytes.copy_from_slice(&word.to_le_bytes());
        }
        raw
    }

    fn swap_bytes(self) -> Self {
        Self {
            magic: self.magic.swap_bytes(),
            code: self.code.swap_bytes(),
            init_data: self.init_data.swap_bytes(),
            uninit_data: self.uninit_data.swap_bytes(),
        }
    }

    /// Bytes occupied by code, initialized and uninitialized data.
    pub fn image_size(&self) -> usize {
        self.code.size as usize + self.init_data.size as usize + self.uninit_data.size as usize
    }
}
