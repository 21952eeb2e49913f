//! Vblank ledger
//!
//! Records every periodic-interrupt window as a `{start_cycle, duration}` pair
//! in arrival order. The number of completed windows is the cursor the section
//! tracker samples when it opens and closes intervals; the cycles spent inside
//! windows between two cursor values are read back in O(1) from a running
//! prefix sum.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::clock::CycleCount;
use crate::error::{Result, TraceError};

/// One completed periodic-interrupt window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VblankInterval {
    pub start_cycle: CycleCount,
    pub duration: u64,
}

/// Ordered record of periodic-interrupt windows for one session
#[derive(Debug, Clone)]
pub struct VblankLedger {
    intervals: Vec<VblankInterval>,
    /// `prefix[i]` is the total duration of the first `i` intervals
    prefix: Vec<u64>,
    pending_start: Option<CycleCount>,
    last_end: Option<CycleCount>,
}

impl Default for VblankLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl VblankLedger {
    pub fn new() -> Self {
        Self {
            intervals: Vec::new(),
            prefix: vec![0],
            pending_start: None,
            last_end: None,
        }
    }

    /// Record a provisional window start
    pub fn on_interval_start(&mut self, cycle_now: CycleCount) {
        if let Some(previous) = self.pending_start.replace(cycle_now) {
            debug!(
                previous,
                cycle_now, "periodic start superseded a pending start"
            );
        }
    }

    /// Close the pending window and append it to the ledger
    pub fn on_interval_end(&mut self, cycle_now: CycleCount) -> Result<()> {
        let start = self
            .pending_start
            .take()
            .ok_or(TraceError::ProtocolViolation { cycle: cycle_now })?;

        let duration = cycle_now.saturating_sub(start);
        let total = self.total_cycles().saturating_add(duration);
        self.intervals.push(VblankInterval {
            start_cycle: start,
            duration,
        });
        self.prefix.push(total);
        self.last_end = Some(cycle_now);

        trace!(start, duration, count = self.count(), "vblank recorded");
        Ok(())
    }

    /// Number of completed windows
    pub fn count(&self) -> usize {
        self.intervals.len()
    }

    /// Total duration of the windows at ledger positions `[from, to)`
    pub fn cycles_in(&self, from: usize, to: usize) -> u64 {
        let to = to.min(self.count());
        if from >= to {
            return 0;
        }
        self.prefix[to] - self.prefix[from]
    }

    /// Total duration of every recorded window
    pub fn total_cycles(&self) -> u64 {
        self.prefix.last().copied().unwrap_or(0)
    }

    /// Cycles elapsed since the most recent window boundary
    ///
    /// Measured from the pending start while a window is open, otherwise from
    /// the last completed end. `None` before any boundary has been seen.
    pub fn cycles_since_boundary(&self, cycle_now: CycleCount) -> Option<u64> {
        self.pending_start
            .or(self.last_end)
            .map(|boundary| cycle_now.saturating_sub(boundary))
    }

    pub fn is_pending(&self) -> bool {
        self.pending_start.is_some()
    }

    pub fn intervals(&self) -> &[VblankInterval] {
        &self.intervals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_end_appends_interval() {
        let mut ledger = VblankLedger::new();
        ledger.on_interval_start(150);
        ledger.on_interval_end(170).unwrap();

        assert_eq!(ledger.count(), 1);
        assert_eq!(
            ledger.intervals()[0],
            VblankInterval {
                start_cycle: 150,
                duration: 20
            }
        );
        assert!(!ledger.is_pending());
    }

    #[test]
    fn test_end_without_start_is_protocol_violation() {
        let mut ledger = VblankLedger::new();
        let err = ledger.on_interval_end(99).unwrap_err();

        assert_eq!(err, TraceError::ProtocolViolation { cycle: 99 });
        assert_eq!(ledger.count(), 0);
        assert_eq!(ledger.total_cycles(), 0);
    }

    #[test]
    fn test_second_start_replaces_pending() {
        let mut ledger = VblankLedger::new();
        ledger.on_interval_start(100);
        ledger.on_interval_start(120);
        ledger.on_interval_end(130).unwrap();

        assert_eq!(ledger.intervals()[0].start_cycle, 120);
        assert_eq!(ledger.intervals()[0].duration, 10);
    }

    #[test]
    fn test_cycles_in_range() {
        let mut ledger = VblankLedger::new();
        for (start, end) in [(10, 15), (30, 37), (60, 71)] {
            ledger.on_interval_start(start);
            ledger.on_interval_end(end).unwrap();
        }

        assert_eq!(ledger.cycles_in(0, 3), 5 + 7 + 11);
        assert_eq!(ledger.cycles_in(1, 2), 7);
        assert_eq!(ledger.cycles_in(2, 2), 0);
        assert_eq!(ledger.cycles_in(2, 1), 0);
        // Upper bound is clamped to the ledger length
        assert_eq!(ledger.cycles_in(2, 10), 11);
        assert_eq!(ledger.total_cycles(), 23);
    }

    #[test]
    fn test_cycles_since_boundary() {
        let mut ledger = VblankLedger::new();
        assert_eq!(ledger.cycles_since_boundary(50), None);

        ledger.on_interval_start(100);
        assert_eq!(ledger.cycles_since_boundary(104), Some(4));

        ledger.on_interval_end(110).unwrap();
        assert_eq!(ledger.cycles_since_boundary(160), Some(50));
    }
}
