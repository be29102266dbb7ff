//! In-memory files

use crate::filesys::{FileSystem, FsError, OpenFile};
use alloc::{
    boxed::Box,
    collections::BTreeMap,
    string::{String, ToString},
    vec::Vec,
};
use core::result::Result;

/// File whose contents live in a heap buffer
#[derive(Debug, Clone, Default)]
pub struct MemoryFile {
    data: Vec<u8>,
}

impl MemoryFile {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn contents(&self) -> &[u8] {
        &self.data
    }
}

impl OpenFile for MemoryFile {
    /// Copies out whatever lies between `offset` and the end of the file
    fn read_at(&mut self, buf: &mut [u8], offset: usize) -> Result<usize, FsError> {
        if offset > self.data.len() {
            return Err(FsError::OutOfRange(offset));
        }
        let count = buf.len().min(self.data.len() - offset);
        buf[..count].copy_from_slice(&self.data[offset..offset + count]);
        Ok(count)
    }

    /// Grows the file as needed so the whole buffer lands
    fn write_at(&mut self, buf: &[u8], offset: usize) -> Result<usize, FsError> {
        let end = offset + buf.len();
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
        self.data[offset..end].copy_from_slice(buf);
        Ok(buf.len())
    }

    fn length(&self) -> usize {
        self.data.len()
    }
}

/// Flat name-to-bytes file system; `open` hands out a snapshot of the file
#[derive(Debug, Clone, Default)]
pub struct MemoryFileSystem {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: &str, data: Vec<u8>) {
        self.files.insert(path.to_string(), data);
    }
}

impl FileSystem for MemoryFileSystem {
    fn open(&mut self, path: &str) -> Result<Box<dyn OpenFile>, FsError> {
        let data = self.files.get(path).ok_or(FsError::NotFound)?;
        Ok(Box::new(MemoryFile::new(data.clone())))
    }
}
