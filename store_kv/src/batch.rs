//! A bounded write-batch queue (§4.2 "Batching", §9 redesign note on
//! batch objects): writes accumulate until the queue reaches
//! `capacity`, at which point the caller drains it and issues the
//! underlying write. Unlike the source's implicit-flush queue, `add`
//! never flushes on its own — callers decide when a full batch is ready
//! and must still call `drain` on every exit path (success or failure) so
//! no entry is silently lost.

#[derive(Debug)]
pub struct Batch<T> {
    capacity: usize,
    entries: Vec<T>,
}

impl<T> Batch<T> {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, entries: Vec::with_capacity(capacity) }
    }

    /// Appends `entry`, returning `true` if the batch is now at capacity and
    /// should be drained and flushed by the caller.
    pub fn add(&mut self, entry: T) -> bool {
        self.entries.push(entry);
        self.entries.len() >= self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes and returns all queued entries, leaving the batch empty.
    pub fn drain(&mut self) -> Vec<T> {
        std::mem::take(&mut self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signals_full_at_capacity() {
        let mut batch = Batch::new(2);
        assert!(!batch.add(1));
        assert!(batch.add(2));
        assert_eq!(batch.drain(), vec![1, 2]);
        assert!(batch.is_empty());
    }

    #[test]
    fn drain_is_idempotent_when_empty() {
        let mut batch: Batch<i32> = Batch::new(4);
        assert!(batch.drain().is_empty());
    }
}
