use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytemuck::Zeroable;

use crate::control::ControlPacket;
use crate::error::MemoryIoError;

pub mod local_memory;
pub mod shmem_process;

pub use local_memory::LocalMemory;
pub use shmem_process::ShmemProcess;

/// Byte-level access to an attached process. Implementations are shared between the tick
/// context and the continuous writer thread.
pub trait MemoryIo: Send + Sync {
    fn read_bytes(&self, address: usize, len: usize) -> Result<Vec<u8>, MemoryIoError>;
    fn write_bytes(&self, address: usize, bytes: &[u8]) -> Result<(), MemoryIoError>;
}

/// Address and packet travel together so the writer never pairs a new address with an old packet.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WriteTarget {
    pub address: usize,
    pub packet: ControlPacket,
}

impl WriteTarget {
    pub fn neutral(address: usize) -> Self {
        WriteTarget {
            address,
            packet: ControlPacket::zeroed(),
        }
    }
}

/// Background thread re-asserting the last control packet at its own cadence.
pub struct ContinuousWriter<M: MemoryIo + 'static> {
    memory: Arc<M>,
    interval: Duration,
    target: Arc<Mutex<Option<WriteTarget>>>,
    running: Arc<AtomicBool>,
    process_lost: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl<M: MemoryIo + 'static> ContinuousWriter<M> {
    pub fn new(memory: Arc<M>, interval: Duration) -> Self {
        ContinuousWriter {
            memory,
            interval,
            target: Arc::new(Mutex::new(None)),
            running: Arc::new(AtomicBool::new(false)),
            process_lost: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    pub fn set(&self, target: WriteTarget) {
        let mut guard = self.target.lock().unwrap_or_else(|err| err.into_inner());
        *guard = Some(target);
    }

    pub fn current(&self) -> Option<WriteTarget> {
        *self.target.lock().unwrap_or_else(|err| err.into_inner())
    }

    pub fn clear(&self) {
        let mut guard = self.target.lock().unwrap_or_else(|err| err.into_inner());
        *guard = None;
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn process_lost(&self) -> bool {
        self.process_lost.load(Ordering::Acquire)
    }

    pub fn start(&mut self) {
        if self.handle.is_some() {
            return;
        }
        tracing::info!(interval_ms = self.interval.as_millis() as u64, "starting memory write thread");
        self.running.store(true, Ordering::Release);
        let memory = Arc::clone(&self.memory);
        let target = Arc::clone(&self.target);
        let running = Arc::clone(&self.running);
        let process_lost = Arc::clone(&self.process_lost);
        let interval = self.interval;
        self.handle = Some(thread::spawn(move || {
            while running.load(Ordering::Acquire) {
                let current = *target.lock().unwrap_or_else(|err| err.into_inner());
                if let Some(WriteTarget { address, packet }) = current {
                    match memory.write_bytes(address, packet.as_bytes()) {
                        Ok(()) => (),
                        Err(err) if err.is_process_lost() => {
                            tracing::error!("memory write thread lost the process: {err}");
                            process_lost.store(true, Ordering::Release);
                            break;
                        }
                        Err(err) => tracing::warn!("continuous write failed: {err}"),
                    }
                }
                thread::sleep(interval);
            }
        }));
    }

    /// Blocks until the writer thread has exited.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("memory write thread panicked");
            }
            tracing::info!("writing stopped");
        }
    }
}

impl<M: MemoryIo + 'static> Drop for ContinuousWriter<M> {
    fn drop(&mut self) {
        self.stop();
    }
}
