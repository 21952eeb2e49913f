//! Lookup tables for derived timing fields
//!
//! Both tables describe fixed animation costs of the host program and are
//! loaded from configuration. An empty narration table (or a missing entry)
//! leaves the narration-adjusted field unadjusted.

use serde::{Deserialize, Serialize};

/// Number of elevator floors with a distinct ride length
pub const ELEVATOR_FLOORS: usize = 10;

/// Wins needed to advance one elevator floor
pub const STREAK_PER_FLOOR: u16 = 7;

/// Frames every narration costs on top of the per-identifier table value
pub const NARRATION_FIXED_FRAMES: u32 = 2;

/// Frames of narration text for one selected identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrationFrames {
    pub identifier: u32,
    pub frames: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupTables {
    /// Frames the elevator ride takes, indexed by floor
    pub elevator_frames: [u32; ELEVATOR_FLOORS],
    /// Narration length per selected identifier
    pub narration: Vec<NarrationFrames>,
}

impl LookupTables {
    pub fn elevator_frames_for(&self, floor: u8) -> u32 {
        self.elevator_frames
            .get(usize::from(floor))
            .copied()
            .unwrap_or(0)
    }

    pub fn narration_frames_for(&self, identifier: u32) -> Option<u32> {
        self.narration
            .iter()
            .find(|entry| entry.identifier == identifier)
            .map(|entry| entry.frames)
    }

    /// Identifier bound more than once in the narration table, if any
    pub fn duplicate_narration(&self) -> Option<u32> {
        let mut seen = std::collections::BTreeSet::new();
        self.narration
            .iter()
            .map(|entry| entry.identifier)
            .find(|id| !seen.insert(*id))
    }
}

/// Elevator floor reached for a win streak, clamped to the top floor
pub fn elevator_floor(win_streak: u16) -> u8 {
    (win_streak / STREAK_PER_FLOOR).min(ELEVATOR_FLOORS as u16 - 1) as u8
}
