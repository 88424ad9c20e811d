//! Memory-mapped views of the input file and the signature file.
//!
//! [`InputRegion`] maps the whole input read-only. [`OutputRegion`] creates
//! the signature file at its final size and maps it writable; workers store
//! digests into it through [`DigestSlots`]. Both release their mapping and
//! file handle when dropped, on every exit path.
//!
//! Empty files are never mapped: a zero-length region is represented without
//! a mapping so it works on every platform.

use std::fs;
use std::marker::PhantomData;
use std::path::Path;
use std::ptr;

use memmap2::{Mmap, MmapMut};

use crate::digest::{DIGEST_SIZE, Digest};
use crate::error::{Result, SignError};
use crate::file::File;

/// Read-only mapping of an entire input file.
pub struct InputRegion {
    _file: fs::File,
    mmap: Option<Mmap>,
}

impl InputRegion {
    /// Opens and maps `path` for reading.
    ///
    /// # Errors
    ///
    /// [`SignError::FileOpen`] if the file cannot be opened or mapped.
    pub fn open(path: &Path) -> Result<Self> {
        let file = fs::File::open(path).map_err(|e| SignError::open(path, e))?;
        let len = file.metadata().map_err(|e| SignError::open(path, e))?.len();

        let mmap = if len == 0 {
            None
        } else {
            // SAFETY: the file handle is kept alive alongside the mapping and
            // the mapping is read-only. Concurrent external truncation of the
            // input is outside what this tool supports.
            Some(unsafe { Mmap::map(&file) }.map_err(|e| SignError::open(path, e))?)
        };

        Ok(Self { _file: file, mmap })
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or_default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Writable mapping of a signature file sized for a fixed number of digests.
pub struct OutputRegion {
    _file: fs::File,
    mmap: Option<MmapMut>,
    slots: usize,
}

impl OutputRegion {
    /// Creates (or truncates) `path`, sizes it to `slots` digests and maps it.
    ///
    /// # Errors
    ///
    /// [`SignError::FileOpen`] if the file cannot be created, resized or mapped.
    pub fn create(path: &Path, slots: u64) -> Result<Self> {
        let too_large = || SignError::open(path, std::io::Error::other("signature does not fit in the address space"));

        let file = File::create(path)?;
        let len = slots.checked_mul(DIGEST_SIZE as u64).ok_or_else(too_large)?;
        let slots = usize::try_from(slots).map_err(|_| too_large())?;
        file.set_len(len).map_err(|e| SignError::open(path, e))?;

        let mmap = if len == 0 {
            None
        } else {
            // SAFETY: the file was just created by us, is kept alive alongside
            // the mapping, and the mapping is the only writer.
            Some(unsafe { MmapMut::map_mut(&file) }.map_err(|e| SignError::open(path, e))?)
        };

        Ok(Self { _file: file, mmap, slots })
    }

    #[inline]
    pub const fn slots(&self) -> usize {
        self.slots
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or_default()
    }

    /// Shared write access to the digest slots.
    pub fn digest_slots(&mut self) -> DigestSlots<'_> {
        let base = self.mmap.as_mut().map_or(ptr::NonNull::dangling().as_ptr(), |m| m.as_mut_ptr());
        DigestSlots { base, slots: self.slots, _region: PhantomData }
    }

    /// Writes dirty pages back to the file.
    pub fn flush(&self) -> Result<()> {
        match &self.mmap {
            Some(mmap) => mmap.flush().map_err(SignError::write),
            None => Ok(()),
        }
    }
}

/// Digest array view of an [`OutputRegion`] that many threads write at once.
///
/// Writes are not synchronised: every index must be stored by at most one
/// thread, which the `WorkPartitioner` guarantees.
pub struct DigestSlots<'a> {
    base: *mut u8,
    slots: usize,
    _region: PhantomData<&'a mut [u8]>,
}

// SAFETY: the view only permits writes through `store`, whose contract makes
// concurrent writes target disjoint slots.
unsafe impl Send for DigestSlots<'_> {}
unsafe impl Sync for DigestSlots<'_> {}

impl DigestSlots<'_> {
    #[inline]
    pub const fn len(&self) -> usize {
        self.slots
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.slots == 0
    }

    /// Stores `digest` at position `index`.
    ///
    /// # Safety
    ///
    /// No other thread may store to the same `index` while this view is alive.
    ///
    /// # Panics
    ///
    /// If `index` is out of bounds.
    #[inline]
    pub unsafe fn store(&self, index: usize, digest: Digest) {
        assert!(index < self.slots, "digest slot {index} out of bounds ({} slots)", self.slots);
        // SAFETY: in bounds per the assert; exclusive per the caller's contract.
        // Digests are byte arrays, so there is no alignment requirement.
        unsafe { ptr::copy_nonoverlapping(digest.as_bytes().as_ptr(), self.base.add(index * DIGEST_SIZE), DIGEST_SIZE) }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_open_missing_input() {
        let dir = tempdir().unwrap();
        let result = InputRegion::open(&dir.path().join("missing"));
        assert!(matches!(result, Err(SignError::FileOpen { .. })));
    }

    #[test]
    fn test_empty_input_maps_to_empty_slice() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty");
        fs::write(&path, b"").unwrap();

        let region = InputRegion::open(&path).unwrap();
        assert!(region.is_empty());
    }

    #[test]
    fn test_input_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("input");
        fs::write(&path, b"mapped bytes").unwrap();

        let region = InputRegion::open(&path).unwrap();
        assert_eq!(region.as_slice(), b"mapped bytes");
    }

    #[test]
    fn test_output_sized_and_written() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.signature");

        let mut region = OutputRegion::create(&path, 3).unwrap();
        {
            let slots = region.digest_slots();
            assert_eq!(slots.len(), 3);
            // SAFETY: single thread.
            unsafe { slots.store(1, Digest::from_bytes([9; DIGEST_SIZE])) };
        }
        region.flush().unwrap();
        drop(region);

        let written = fs::read(&path).unwrap();
        assert_eq!(written.len(), 3 * DIGEST_SIZE);
        assert!(written[..DIGEST_SIZE].iter().all(|&b| b == 0));
        assert!(written[DIGEST_SIZE..2 * DIGEST_SIZE].iter().all(|&b| b == 9));
    }

    #[test]
    fn test_zero_slots_creates_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.signature");

        let mut region = OutputRegion::create(&path, 0).unwrap();
        assert!(region.digest_slots().is_empty());
        region.flush().unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_store_out_of_bounds_panics() {
        let dir = tempdir().unwrap();
        let mut region = OutputRegion::create(&dir.path().join("out"), 1).unwrap();
        // SAFETY: single thread.
        unsafe { region.digest_slots().store(1, Digest::from_bytes([0; DIGEST_SIZE])) };
    }
}
