use hashbrown::HashMap;

use crate::types::TaskResult;

/// Holds results that finished ahead of their turn.
pub struct Buffer {
    buffer: HashMap<u64, TaskResult>,

    next_idx: u64,
}

impl Buffer {
    #[inline]
    pub fn new(start: u64) -> Self {
        Self { buffer: HashMap::new(), next_idx: start }
    }

    /// Stores `result` and returns every result that is now next in sequence.
    #[must_use]
    #[inline]
    pub fn add(&mut self, result: TaskResult) -> Vec<TaskResult> {
        self.buffer.insert(result.index, result);

        let mut ready: Vec<TaskResult> = Vec::new();

        while let Some(result) = self.buffer.remove(&self.next_idx) {
            ready.push(result);
            self.next_idx += 1;
        }

        ready
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    pub const fn next_index(&self) -> u64 {
        self.next_idx
    }
}
