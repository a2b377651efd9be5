//! Slot arena backing the playback queue.
//!
//! Buffers live in an indexed arena; the Active queue and Idle list hold
//! slot indices, never pointers. A slot is in at most one of the two sets
//! at any time.

use std::collections::VecDeque;

/// One pooled buffer: fixed-capacity storage plus the current length.
#[derive(Debug)]
struct Slot {
    data: Vec<u8>,
    len: usize,
}

/// Arena of fixed-capacity buffer slots with Active/Idle index queues.
///
/// Active is the ordered queue of chunks waiting for the device. Idle
/// slots are recycled for reuse; beyond a small cap their storage is
/// released so a burst of large buffers does not pin memory forever.
#[derive(Debug)]
pub(crate) struct BufferPool {
    slots: Vec<Slot>,
    active: VecDeque<usize>,
    idle: Vec<usize>,
    active_bytes: u32,
    idle_cap: usize,
}

impl BufferPool {
    /// Creates an empty pool. Slots are allocated lazily on first use.
    pub fn new(idle_cap: usize) -> Self {
        Self {
            slots: Vec::new(),
            active: VecDeque::new(),
            idle: Vec::new(),
            active_bytes: 0,
            idle_cap,
        }
    }

    /// Copies `data` into a slot (recycled or freshly allocated) and
    /// appends it to the Active tail. Returns the slot index.
    pub fn push_back(&mut self, data: &[u8]) -> usize {
        let idx = match self.idle.pop() {
            Some(idx) => idx,
            None => {
                self.slots.push(Slot {
                    data: Vec::new(),
                    len: 0,
                });
                self.slots.len() - 1
            }
        };

        let slot = &mut self.slots[idx];
        slot.data.clear();
        slot.data.extend_from_slice(data);
        slot.len = data.len();

        self.active.push_back(idx);
        self.active_bytes += data.len() as u32;
        idx
    }

    /// The slot index at the Active head, if any.
    pub fn front(&self) -> Option<usize> {
        self.active.front().copied()
    }

    /// Pops the Active head. The slot stays owned by the caller until
    /// [`recycle`](Self::recycle) returns it.
    pub fn pop_front(&mut self) -> Option<usize> {
        let idx = self.active.pop_front()?;
        self.active_bytes -= self.slots[idx].len as u32;
        Some(idx)
    }

    /// The payload bytes of a slot.
    pub fn data(&self, idx: usize) -> &[u8] {
        &self.slots[idx].data[..self.slots[idx].len]
    }

    /// Returns a slot to the Idle list.
    ///
    /// Beyond the idle cap the slot's storage is released; the slot id
    /// stays reusable and reallocates on next use.
    pub fn recycle(&mut self, idx: usize) {
        let slot = &mut self.slots[idx];
        slot.len = 0;
        if self.idle.len() >= self.idle_cap {
            slot.data = Vec::new();
        }
        self.idle.push(idx);
    }

    /// Moves every Active slot to Idle (capped, excess storage freed).
    pub fn flush_active_to_idle(&mut self) {
        while let Some(idx) = self.pop_front() {
            self.recycle(idx);
        }
    }

    /// Drops all slots in both sets. Used on format change.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.active.clear();
        self.idle.clear();
        self.active_bytes = 0;
    }

    /// Total bytes across the Active queue.
    pub fn active_bytes(&self) -> u32 {
        self.active_bytes
    }

    /// Number of chunks in the Active queue.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// `true` if no chunks are queued.
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    #[cfg(test)]
    pub fn idle_count(&self) -> usize {
        self.idle.len()
    }
}
