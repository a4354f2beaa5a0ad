use std::sync::Mutex;

use shared_memory::{Shmem, ShmemConf};

use crate::error::MemoryIoError;

use super::MemoryIo;

/// Process memory mirrored through a shared memory mapping published under a flink by an
/// in-process helper. Addresses are translated relative to `base`.
pub struct ShmemProcess {
    shmem: Mutex<Shmem>,
    base: usize,
}

// SAFETY: `Shmem` is only `!Send` because it holds a raw pointer to the mapping. The mapping is
// owned by this struct, never handed out, and every read or write goes through the mutex.
unsafe impl Send for ShmemProcess {}
unsafe impl Sync for ShmemProcess {}

impl ShmemProcess {
    pub fn attach(flink: &str, base: usize) -> Result<Self, MemoryIoError> {
        let shmem = ShmemConf::new().flink(flink).open().map_err(|err| {
            MemoryIoError::NotFound(format!("unable to open shmem flink {}: {}", flink, err))
        })?;
        tracing::info!(flink, size = shmem.len(), "attached to shared memory");
        Ok(ShmemProcess {
            shmem: Mutex::new(shmem),
            base,
        })
    }

    fn offset(&self, address: usize, len: usize, size: usize) -> Option<usize> {
        let start = address.checked_sub(self.base)?;
        (start.checked_add(len)? <= size).then_some(start)
    }
}

impl MemoryIo for ShmemProcess {
    fn read_bytes(&self, address: usize, len: usize) -> Result<Vec<u8>, MemoryIoError> {
        let shmem = self.shmem.lock().unwrap_or_else(|err| err.into_inner());
        let start = self
            .offset(address, len, shmem.len())
            .ok_or_else(|| MemoryIoError::Read {
                address,
                len,
                reason: format!("outside of {} byte mapping", shmem.len()),
            })?;
        let slice = unsafe { shmem.as_slice() };
        Ok(slice[start..start + len].to_vec())
    }

    fn write_bytes(&self, address: usize, bytes: &[u8]) -> Result<(), MemoryIoError> {
        let mut shmem = self.shmem.lock().unwrap_or_else(|err| err.into_inner());
        let size = shmem.len();
        let start = self
            .offset(address, bytes.len(), size)
            .ok_or_else(|| MemoryIoError::Write {
                address,
                len: bytes.len(),
                reason: format!("outside of {} byte mapping", size),
            })?;
        let slice = unsafe { shmem.as_slice_mut() };
        slice[start..start + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}
