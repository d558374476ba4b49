//! Memory-mapped frozen files.
//!
//! This module requires the `mmap` feature.

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use super::{map, MapFlags, Mappable};
use crate::error::Result;

/// A read-only memory mapping of a frozen file.
///
/// Structures mapped from it borrow the mapping, so it must outlive them.
/// The mapping is page-aligned, so every 8-byte aligned vector in the file is
/// bound without copying.
pub struct MappedFile {
    mmap: Mmap,
}

impl MappedFile {
    /// Open a file and memory-map it.
    ///
    /// The file must not be modified or truncated while the mapping, or any
    /// structure mapped from it, is alive.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let mmap = unsafe { Mmap::map(&file)? };
        tracing::debug!(path = %path.as_ref().display(), bytes = mmap.len(), "mapped file");
        Ok(Self { mmap })
    }

    /// Map a structure from the file.
    pub fn map<'a, T>(&'a self, flags: MapFlags) -> Result<T>
    where
        T: Mappable<'a> + Default,
    {
        map(&self.mmap, flags)
    }

    /// Get the underlying bytes.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.mmap
    }

    /// Get the number of mapped bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    /// Check if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }
}
