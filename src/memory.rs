//! Shared memory pools
//!
//! A [`SharedMemory`] is an anonymous memory map that both the harness and
//! the device hold a handle to. The harness owns the pool; during an
//! execution the device is allowed to write output pools, and the harness
//! reads them only after the completion signal resolved.
//!
//! # Thread Safety
//!
//! Handles are cheap `Arc` clones. The mapping sits behind a mutex that is
//! held only for the duration of a single copy, never across an
//! asynchronous boundary.

use memmap2::MmapMut;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{VtsError, VtsResult};

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

struct PoolInner {
    id: u64,
    size: usize,
    map: Mutex<MmapMut>,
}

/// Shared, fixed-size memory region
#[derive(Clone)]
pub struct SharedMemory {
    inner: Arc<PoolInner>,
}

impl SharedMemory {
    /// Map a zero-filled anonymous region of `size` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`VtsError::MemoryMapFailed`] for zero-sized pools or when the
    /// OS refuses the mapping.
    pub fn allocate(size: usize) -> VtsResult<Self> {
        if size == 0 {
            return Err(VtsError::MemoryMapFailed(
                "cannot map a zero-sized pool".to_string(),
            ));
        }

        let map = MmapMut::map_anon(size).map_err(|e| {
            VtsError::MemoryMapFailed(format!("anonymous map of {} bytes: {}", size, e))
        })?;

        let id = NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(pool = id, size, "mapped shared memory pool");

        Ok(Self {
            inner: Arc::new(PoolInner {
                id,
                size,
                map: Mutex::new(map),
            }),
        })
    }

    /// Map a pool holding a copy of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> VtsResult<Self> {
        let pool = Self::allocate(bytes.len())?;
        pool.write(0, bytes)?;
        Ok(pool)
    }

    pub fn len(&self) -> usize {
        self.inner.size
    }

    pub fn is_empty(&self) -> bool {
        self.inner.size == 0
    }

    /// True if both handles refer to the same mapping.
    pub fn ptr_eq(&self, other: &SharedMemory) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn check_range(&self, offset: usize, length: usize) -> VtsResult<std::ops::Range<usize>> {
        let end = offset.checked_add(length).filter(|&end| end <= self.inner.size);
        match end {
            Some(end) => Ok(offset..end),
            None => Err(VtsError::PoolOutOfBounds {
                offset,
                length,
                size: self.inner.size,
            }),
        }
    }

    /// Copy `bytes` into the pool at `offset`.
    pub fn write(&self, offset: usize, bytes: &[u8]) -> VtsResult<()> {
        let range = self.check_range(offset, bytes.len())?;
        let mut map = self.inner.map.lock()?;
        map[range].copy_from_slice(bytes);
        Ok(())
    }

    /// Copy `length` bytes out of the pool starting at `offset`.
    pub fn read(&self, offset: usize, length: usize) -> VtsResult<Vec<u8>> {
        let range = self.check_range(offset, length)?;
        let map = self.inner.map.lock()?;
        Ok(map[range].to_vec())
    }

    /// Run `f` over the whole mapping while holding the pool lock.
    pub fn with_bytes_mut<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> VtsResult<R> {
        let mut map = self.inner.map.lock()?;
        Ok(f(&mut map[..]))
    }
}

impl fmt::Debug for SharedMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedMemory")
            .field("id", &self.inner.id)
            .field("size", &self.inner.size)
            .finish()
    }
}
