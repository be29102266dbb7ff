use alloc::boxed::Box;
use core::result::Result;

pub mod memory;

// Define error types for the filesystem operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FsError {
    #[error("file not found")]
    NotFound,
    #[error("offset {0} is past the end of the file")]
    OutOfRange(usize),
    #[error("short transfer: wanted {wanted} bytes, got {got}")]
    UnexpectedEof { wanted: usize, got: usize },
    #[error("I/O error")]
    IOError,
}

// Core traits for the external file capability

/// An open file addressed by absolute byte offset.
pub trait OpenFile: Send {
    /// Reads up to `buf.len()` bytes starting at `offset`, returning the count read.
    fn read_at(&mut self, buf: &mut [u8], offset: usize) -> Result<usize, FsError>;

    /// Writes `buf` starting at `offset`, returning the count written.
    fn write_at(&mut self, buf: &[u8], offset: usize) -> Result<usize, FsError>;

    fn length(&self) -> usize;

    /// Fills `buf` completely from `offset` or fails with `UnexpectedEof`.
    fn read_exact_at(&mut self, buf: &mut [u8], offset: usize) -> Result<(), FsError> {
        let got = self.read_at(buf, offset)?;
        if got != buf.len() {
            return Err(FsError::UnexpectedEof {
                wanted: buf.len(),
                got,
            });
        }
        Ok(())
    }

    fn write_all_at(&mut self, buf: &[u8], offset: usize) -> Result<(), FsError> {
        let got = self.write_at(buf, offset)?;
        if got != buf.len() {
            return Err(FsError::UnexpectedEof {
                wanted: buf.len(),
                got,
            });
        }
        Ok(())
    }
}

/// Name-based access to executables and data files.
pub trait FileSystem {
    fn open(&mut self, path: &str) -> Result<Box<dyn OpenFile>, FsError>;
}
