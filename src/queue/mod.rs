use std::collections::VecDeque;

/// Raw uplinked commands in arrival order.
///
/// Enqueue never inspects or rejects content; malformed payloads are kept
/// alongside valid ones. No state consumes the queue, so it doubles as an
/// audit trail of everything the rover received.
#[derive(Debug, Default)]
pub struct InstructionQueue {
    entries: VecDeque<Vec<u8>>,
}

impl InstructionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, message: Vec<u8>) {
        self.entries.push_back(message);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Oldest entry still queued.
    pub fn peek(&self) -> Option<&[u8]> {
        self.entries.front().map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.entries.iter().map(Vec::as_slice)
    }

    /// Remove and return every entry, oldest first.
    pub fn drain(&mut self) -> Vec<Vec<u8>> {
        self.entries.drain(..).collect()
    }
}
