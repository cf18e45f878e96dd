use log::trace;
use std::sync::RwLock;

use crate::error::{OutputError, Result};
use crate::sample::SampleContainer;

/// Samples waiting for the next flush.
///
/// Any number of producers may append concurrently. `drain` swaps the whole
/// contents out under the write lock, so every container ends up in exactly
/// one drain.
pub struct SampleBuffer {
    buffer: RwLock<Vec<SampleContainer>>,
}

impl SampleBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self {
            buffer: RwLock::new(Vec::new()),
        }
    }

    /// Append containers to the buffer
    pub fn add(&self, containers: Vec<SampleContainer>) -> Result<()> {
        if containers.is_empty() {
            return Ok(());
        }

        let mut buffer = self
            .buffer
            .write()
            .map_err(|_| OutputError::Buffer("Lock poisoned".to_string()))?;

        trace!("Buffering {} sample containers", containers.len());
        buffer.extend(containers);

        Ok(())
    }

    /// Take everything buffered so far, leaving the buffer empty
    pub fn drain(&self) -> Result<Vec<SampleContainer>> {
        let mut buffer = self
            .buffer
            .write()
            .map_err(|_| OutputError::Buffer("Lock poisoned".to_string()))?;
        Ok(std::mem::take(&mut *buffer))
    }

    /// Number of buffered containers
    pub fn len(&self) -> Result<usize> {
        let buffer = self
            .buffer
            .read()
            .map_err(|_| OutputError::Buffer("Lock poisoned".to_string()))?;
        Ok(buffer.len())
    }

    /// Number of buffered samples across all containers
    pub fn sample_count(&self) -> Result<usize> {
        let buffer = self
            .buffer
            .read()
            .map_err(|_| OutputError::Buffer("Lock poisoned".to_string()))?;
        Ok(buffer.iter().map(SampleContainer::len).sum())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl Default for SampleBuffer {
    fn default() -> Self {
        Self::new()
    }
}
