//! Random-access backing storage for a ZIM archive.
//!
//! The engine never assumes a particular I/O strategy: a [`Source`] is
//! anything that can answer `read_at(offset, len)` concurrently from many
//! threads. Two implementations are provided — a positional-read file
//! handle and a read-only memory map — mirroring the two backends real ZIM
//! readers use in practice.

use std::fs::File;
#[cfg(not(unix))]
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
#[cfg(not(unix))]
use std::sync::Mutex;

use crate::error::{Error, Result};

/// A concurrently-readable byte range provider.
///
/// Implementations must support being called from many threads at once;
/// no operation here should require exclusive access to the whole archive.
pub trait Source: Send + Sync {
    /// Reads exactly `len` bytes starting at `offset`.
    fn read_at(&self, offset: u64, len: usize) -> Result<Vec<u8>>;

    /// Total size of the backing storage, in bytes.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A [`Source`] backed by a plain file handle using positional reads.
///
/// On Unix this uses `pread` via [`std::os::unix::fs::FileExt`], which is
/// safe to call concurrently without synchronization. Platforms lacking a
/// positional-read primitive fall back to a mutex-guarded seek+read.
pub struct FileSource {
    #[cfg(unix)]
    file: File,
    #[cfg(not(unix))]
    file: Mutex<File>,
    len: u64,
}

impl FileSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(FileSource {
            #[cfg(unix)]
            file,
            #[cfg(not(unix))]
            file: Mutex::new(file),
            len,
        })
    }
}

impl Source for FileSource {
    #[cfg(unix)]
    fn read_at(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        use std::os::unix::fs::FileExt;
        let mut buf = vec![0u8; len];
        self.file.read_exact_at(&mut buf, offset)?;
        Ok(buf)
    }

    #[cfg(not(unix))]
    fn read_at(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let mut file = self.file.lock().expect("file source mutex poisoned");
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; len];
        file.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn len(&self) -> u64 {
        self.len
    }
}

/// A [`Source`] backed by a read-only memory map.
pub struct MmapSource {
    mmap: memmap2::Mmap,
}

impl MmapSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        // SAFETY: the mapping is read-only for the lifetime of this struct;
        // callers are responsible for not mutating the underlying file out
        // from under a live archive, the same caveat every mmap-backed
        // reader carries.
        let mmap = unsafe { memmap2::Mmap::map(&file)? };
        Ok(MmapSource { mmap })
    }
}

impl Source for MmapSource {
    fn read_at(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let start = offset as usize;
        let end = start
            .checked_add(len)
            .ok_or(Error::OutOfRange {
                what: "source offset",
                index: offset,
                len: self.mmap.len() as u64,
            })?;
        self.mmap
            .get(start..end)
            .map(|s| s.to_vec())
            .ok_or(Error::OutOfRange {
                what: "source offset",
                index: offset,
                len: self.mmap.len() as u64,
            })
    }

    fn len(&self) -> u64 {
        self.mmap.len() as u64
    }
}

/// A [`Source`] backed by an owned in-memory byte buffer.
///
/// Used to build archives from bytes assembled in memory rather than read
/// from disk — test fixtures, and any caller that already has the whole
/// archive loaded (e.g. fetched over the network).
pub struct MemorySource {
    bytes: Vec<u8>,
}

impl MemorySource {
    pub fn new(bytes: Vec<u8>) -> Self {
        MemorySource { bytes }
    }
}

impl Source for MemorySource {
    fn read_at(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let start = offset as usize;
        let end = start
            .checked_add(len)
            .ok_or(Error::OutOfRange {
                what: "source offset",
                index: offset,
                len: self.bytes.len() as u64,
            })?;
        self.bytes
            .get(start..end)
            .map(|s| s.to_vec())
            .ok_or(Error::OutOfRange {
                what: "source offset",
                index: offset,
                len: self.bytes.len() as u64,
            })
    }

    fn len(&self) -> u64 {
        self.bytes.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn file_source_reads_exact_ranges() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"hello world").unwrap();
        let src = FileSource::open(tmp.path()).unwrap();
        assert_eq!(src.len(), 11);
        assert_eq!(src.read_at(6, 5).unwrap(), b"world");
    }

    #[test]
    fn mmap_source_matches_file_source() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"hello world").unwrap();
        let a = FileSource::open(tmp.path()).unwrap();
        let b = MmapSource::open(tmp.path()).unwrap();
        assert_eq!(a.read_at(0, 11).unwrap(), b.read_at(0, 11).unwrap());
    }
}
