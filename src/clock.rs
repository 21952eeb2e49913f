//! Cycle clock adapter
//!
//! The host hands us two kinds of time: a 64-bit cycle stamp attached to every
//! hook fire, and a 32-bit frame counter that can be read directly from memory.
//! [`CycleClock`] guards the first against regressions; [`Host`] exposes the
//! second along with the other scalars read at finalize.

use crate::error::{Result, TraceError};

/// Monotonic host cycle count
pub type CycleCount = u64;

/// Directly addressable host values read on demand
pub trait Host {
    /// Monotonically increasing frame counter used to timestamp random draws
    fn read_counter(&self) -> u32;

    /// Current win streak, read once when the report is assembled
    fn read_win_streak(&self) -> u16;
}

/// Host values captured up front, used by replay and tests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotHost {
    pub counter: u32,
    pub win_streak: u16,
}

impl SnapshotHost {
    pub fn new(counter: u32, win_streak: u16) -> Self {
        Self {
            counter,
            win_streak,
        }
    }
}

impl Host for SnapshotHost {
    fn read_counter(&self) -> u32 {
        self.counter
    }

    fn read_win_streak(&self) -> u16 {
        self.win_streak
    }
}

/// Tracks the latest cycle stamp seen from the host
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleClock {
    latest: Option<CycleCount>,
}

impl CycleClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept a new stamp, rejecting anything older than the latest one
    ///
    /// On rejection the clock keeps its previous value, so callers can fall
    /// back to [`CycleClock::latest`] and keep durations non-negative.
    pub fn observe(&mut self, cycle: CycleCount) -> Result<CycleCount> {
        match self.latest {
            Some(last) if cycle < last => Err(TraceError::CycleRegression { cycle, last }),
            _ => {
                self.latest = Some(cycle);
                Ok(cycle)
            }
        }
    }

    /// Restart the clock at a session boundary
    pub fn restart(&mut self, cycle: CycleCount) -> CycleCount {
        self.latest = Some(cycle);
        cycle
    }

    pub fn latest(&self) -> Option<CycleCount> {
        self.latest
    }
}
