use crate::backend::SourceHandle;
use crate::error::{OutputError, Result};

/// Fixed pool of hardware playback voices.
///
/// The pool is filled once at device init and never grows. Free handles are
/// reused in stack order; each handle is held by exactly one live voice or
/// by the free list, never both.
pub struct SourcePool {
    free: Vec<SourceHandle>,
    capacity: usize,
}

impl SourcePool {
    pub fn new(sources: Vec<SourceHandle>) -> Self {
        let capacity = sources.len();
        Self {
            free: sources,
            capacity,
        }
    }

    pub fn empty() -> Self {
        Self {
            free: Vec::new(),
            capacity: 0,
        }
    }

    /// Take a free source. This is a hard capacity limit: an empty pool fails
    /// immediately rather than blocking or queueing.
    pub fn acquire(&mut self) -> Result<SourceHandle> {
        self.free.pop().ok_or(OutputError::ResourceExhausted)
    }

    /// Return a source to the free list. Called exactly once per successful
    /// acquire, unconditionally, even if the source's last operation errored.
    pub fn release(&mut self, source: SourceHandle) {
        self.free.push(source);
    }

    /// Drain every free source, leaving an unusable pool. Used at device
    /// teardown.
    pub fn drain(&mut self) -> Vec<SourceHandle> {
        self.capacity = 0;
        std::mem::take(&mut self.free)
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
