//! Outstanding outbound writes, for the origin-tag echo guard.

use std::collections::VecDeque;

/// Every outbound write gets a sequence number and is remembered until the
/// engine's notification for it comes back. Bounded: the oldest entries are
/// forgotten once `capacity` writes are outstanding.
#[derive(Debug)]
pub(crate) struct EchoLedger<T> {
    capacity: usize,
    next_seq: u64,
    outstanding: VecDeque<(u64, T)>,
}

impl<T: PartialEq> EchoLedger<T> {
    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), next_seq: 1, outstanding: VecDeque::new() }
    }

    pub fn record(&mut self, value: T) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        if self.outstanding.len() == self.capacity {
            self.outstanding.pop_front();
        }
        self.outstanding.push_back((seq, value));
        seq
    }

    /// Consume the oldest outstanding write of `value`, and every write
    /// issued before it (their notifications were coalesced by the engine).
    pub fn consume(&mut self, value: &T) -> Option<u64> {
        let pos = self.outstanding.iter().position(|(_, v)| v == value)?;
        let (seq, _) = self.outstanding.drain(..=pos).last()?;
        Some(seq)
    }

    pub fn len(&self) -> usize {
        self.outstanding.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outstanding.is_empty()
    }

    pub fn clear(&mut self) {
        self.outstanding.clear();
    }
}
