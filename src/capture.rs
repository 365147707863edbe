//! Capture-file reading: one contiguous read-only byte buffer per file.
//!
//! Regular files are memory-mapped so multi-gigabyte captures never get
//! copied; anything that refuses to map (pipes, zero-length files, exotic
//! filesystems) falls back to an owned read. Either way the scanner sees a
//! plain `&[u8]`.

use std::fs::File;
use std::io::{self, Read};
use std::ops::Deref;
use std::path::Path;

use memmap2::Mmap;

/// A capture payload held either as a mapping or an owned buffer.
pub enum CaptureBuffer {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl CaptureBuffer {
    /// Opens `path` for scanning.
    pub fn open(path: &Path) -> io::Result<Self> {
        let mut file = File::open(path)?;
        let len = file.metadata()?.len();
        if len > 0 {
            // SAFETY: the mapping is read-only and lives as long as the
            // buffer; concurrent truncation of the underlying file is outside
            // the supported contract, as with any mapped reader.
            if let Ok(map) = unsafe { Mmap::map(&file) } {
                return Ok(Self::Mapped(map));
            }
        }
        let mut buf = Vec::with_capacity(len as usize);
        file.read_to_end(&mut buf)?;
        Ok(Self::Owned(buf))
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Mapped(map) => map,
            Self::Owned(buf) => buf,
        }
    }
}

impl Deref for CaptureBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_bytes()
    }
}
