use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::error::MemoryIoError;

use super::MemoryIo;

/// An in-process memory region standing in for an attached game process.
pub struct LocalMemory {
    base: usize,
    bytes: Mutex<Vec<u8>>,
    detached: AtomicBool,
}

impl LocalMemory {
    pub fn new(base: usize, len: usize) -> Self {
        LocalMemory {
            base,
            bytes: Mutex::new(vec![0_u8; len]),
            detached: AtomicBool::new(false),
        }
    }

    /// Every later access fails with `ProcessGone`.
    pub fn detach(&self) {
        self.detached.store(true, Ordering::Release);
    }

    fn range(&self, address: usize, len: usize, size: usize) -> Option<std::ops::Range<usize>> {
        let start = address.checked_sub(self.base)?;
        let end = start.checked_add(len)?;
        (end <= size).then_some(start..end)
    }
}

impl MemoryIo for LocalMemory {
    fn read_bytes(&self, address: usize, len: usize) -> Result<Vec<u8>, MemoryIoError> {
        if self.detached.load(Ordering::Acquire) {
            return Err(MemoryIoError::ProcessGone);
        }
        let bytes = self.bytes.lock().unwrap_or_else(|err| err.into_inner());
        let range = self
            .range(address, len, bytes.len())
            .ok_or_else(|| MemoryIoError::Read {
                address,
                len,
                reason: "address outside mapped region".to_string(),
            })?;
        Ok(bytes[range].to_vec())
    }

    fn write_bytes(&self, address: usize, data: &[u8]) -> Result<(), MemoryIoError> {
        if self.detached.load(Ordering::Acquire) {
            return Err(MemoryIoError::ProcessGone);
        }
        let mut bytes = self.bytes.lock().unwrap_or_else(|err| err.into_inner());
        let size = bytes.len();
        let range = self
            .range(address, data.len(), size)
            .ok_or_else(|| MemoryIoError::Write {
                address,
                len: data.len(),
                reason: "address outside mapped region".to_string(),
            })?;
        bytes[range].copy_from_slice(data);
        Ok(())
    }
}
