//! Double-buffered event queue.
//!
//! Two fixed-role buffers alternate between accepting writes and being
//! drained, so serializing a batch never delays new events. Single-writer
//! access is enforced at compile time: every method takes `&mut self`,
//! and only the producer thread holds the queue.

use event_wire::EventRecord;

#[derive(Debug, Default)]
pub(crate) struct EventBuffers {
    buffers: [Vec<EventRecord>; 2],
    active: usize,
}

impl EventBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends to the active buffer.
    pub fn push(&mut self, record: EventRecord) {
        self.buffers[self.active].push(record);
    }

    pub fn active_is_empty(&self) -> bool {
        self.buffers[self.active].is_empty()
    }

    /// Flips the active index and returns the previously active slot,
    /// which from now on receives no new writes.
    pub fn swap(&mut self) -> usize {
        let draining = self.active;
        self.active = 1 - self.active;
        draining
    }

    /// Takes the records out of a slot, leaving it empty for reuse.
    pub fn drain(&mut self, slot: usize) -> Vec<EventRecord> {
        std::mem::take(&mut self.buffers[slot])
    }
}
