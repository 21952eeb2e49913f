//! Outbound report queue
//!
//! Encoded reports are handed off to an external transport. Instead of
//! spawning a send per report, finalize enqueues a task here and the transport
//! drains the queue on its own schedule, on the same thread.

use std::collections::VecDeque;

use tracing::warn;

/// One encoded report waiting for the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundReport {
    /// Monotonic per-outbox sequence number
    pub sequence: u64,
    pub text: String,
}

#[derive(Debug, Default)]
pub struct Outbox {
    queue: VecDeque<OutboundReport>,
    next_sequence: u64,
    /// Oldest entries are evicted beyond this many pending reports
    capacity: Option<usize>,
    evicted: u64,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bounded(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity.max(1)),
            ..Self::default()
        }
    }

    /// Queue an encoded report and return its sequence number
    pub fn enqueue(&mut self, text: String) -> u64 {
        if let Some(capacity) = self.capacity {
            while self.queue.len() >= capacity {
                if let Some(old) = self.queue.pop_front() {
                    self.evicted += 1;
                    warn!(sequence = old.sequence, "outbox full; evicting oldest report");
                }
            }
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.queue.push_back(OutboundReport { sequence, text });
        sequence
    }

    pub fn pop(&mut self) -> Option<OutboundReport> {
        self.queue.pop_front()
    }

    /// Take every pending report in FIFO order
    pub fn drain(&mut self) -> impl Iterator<Item = OutboundReport> + '_ {
        self.queue.drain(..)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn evicted(&self) -> u64 {
        self.evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order_and_sequence() {
        let mut outbox = Outbox::new();
        assert_eq!(outbox.enqueue("a".into()), 0);
        assert_eq!(outbox.enqueue("b".into()), 1);

        let drained: Vec<_> = outbox.drain().map(|r| r.text).collect();
        assert_eq!(drained, vec!["a", "b"]);
        assert!(outbox.is_empty());

        // Sequence keeps counting after a drain
        assert_eq!(outbox.enqueue("c".into()), 2);
    }

    #[test]
    fn test_bounded_evicts_oldest() {
        let mut outbox = Outbox::bounded(2);
        outbox.enqueue("a".into());
        outbox.enqueue("b".into());
        outbox.enqueue("c".into());

        assert_eq!(outbox.len(), 2);
        assert_eq!(outbox.evicted(), 1);
        assert_eq!(outbox.pop().unwrap().text, "b");
    }
}
