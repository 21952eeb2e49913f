//! Report assembler
//!
//! A [`Report`] is built exactly once, at finalize, from borrowed session
//! state. Missing optional inputs never fail assembly: without a selection,
//! or without an entity drawn at or after it, the affected derived fields are
//! `None`. A selected identifier with no narration entry is adjusted by the
//! fixed frames only.

use serde::{Deserialize, Serialize};

use crate::modulo::ModuloHistograms;
use crate::section::ClosedInterval;
use crate::tables::{elevator_floor, LookupTables, NARRATION_FIXED_FRAMES};
use crate::vblank::{VblankInterval, VblankLedger};

/// Number of generated-entity slots carried by a report
pub const ENTITY_SLOTS: usize = 3;

/// A generated entity captured from registers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySlot {
    pub id: u32,
    /// Opaque value, rendered as big-endian hex
    #[serde(with = "payload_hex")]
    pub payload: u32,
    /// Frame counter at the time the entity was drawn
    pub drawn_at: u32,
}

/// The selection hook's identifier and the frame counter when it fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub identifier: u32,
    pub counter: u32,
}

/// Frame counts derived from observed counters and the lookup tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedTiming {
    pub elevator_floor: u8,
    pub frames_before_selection_with_shortcut: Option<u32>,
    pub frames_before_selection_without_shortcut: Option<u32>,
    pub frames_between_selection_and_first_entity_with_narration: Option<u32>,
    pub frames_between_selection_and_first_entity_without_narration: Option<u32>,
}

/// Everything the assembler reads, borrowed from the finished session
#[derive(Debug, Clone, Copy)]
pub struct AssemblyInputs<'a> {
    pub intervals: &'a [ClosedInterval],
    pub ledger: &'a VblankLedger,
    pub histograms: &'a ModuloHistograms,
    pub slots: &'a [Option<EntitySlot>; ENTITY_SLOTS],
    pub selection: Option<Selection>,
    /// Frame counter read at session reset
    pub reset_counter: u32,
    pub win_streak: u16,
    pub anomalies: u64,
}

/// Immutable execution-timing report for one session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    selected_identifier: Option<u32>,
    slots: [Option<EntitySlot>; ENTITY_SLOTS],
    intervals: Vec<ClosedInterval>,
    vblanks: Vec<VblankInterval>,
    histograms: ModuloHistograms,
    timing: DerivedTiming,
    win_streak: u16,
    anomalies: u64,
}

impl Report {
    pub fn selected_identifier(&self) -> Option<u32> {
        self.selected_identifier
    }

    pub fn slots(&self) -> &[Option<EntitySlot>; ENTITY_SLOTS] {
        &self.slots
    }

    pub fn intervals(&self) -> &[ClosedInterval] {
        &self.intervals
    }

    pub fn vblanks(&self) -> &[VblankInterval] {
        &self.vblanks
    }

    pub fn histograms(&self) -> &ModuloHistograms {
        &self.histograms
    }

    pub fn timing(&self) -> &DerivedTiming {
        &self.timing
    }

    pub fn win_streak(&self) -> u16 {
        self.win_streak
    }

    /// Anomalies logged and recovered while the session ran
    pub fn anomalies(&self) -> u64 {
        self.anomalies
    }

    pub fn retry_count(&self) -> usize {
        self.intervals.iter().filter(|i| i.is_retry).count()
    }
}

/// Build the report for a finished session
pub fn assemble(inputs: &AssemblyInputs<'_>, tables: &LookupTables) -> Report {
    let timing = derive_timing(
        inputs.reset_counter,
        inputs.selection,
        inputs.slots,
        inputs.win_streak,
        tables,
    );

    Report {
        selected_identifier: inputs.selection.map(|s| s.identifier),
        slots: *inputs.slots,
        intervals: inputs.intervals.to_vec(),
        vblanks: inputs.ledger.intervals().to_vec(),
        histograms: inputs.histograms.clone(),
        timing,
        win_streak: inputs.win_streak,
        anomalies: inputs.anomalies,
    }
}

/// Frames from `earlier` to `later` on the wrapping frame counter
///
/// A delta in the upper half of the `u32` range means `later` was read
/// before `earlier`, not after a rollover.
fn frames_since(later: u32, earlier: u32) -> Option<u32> {
    let delta = later.wrapping_sub(earlier);
    (delta <= i32::MAX as u32).then_some(delta)
}

/// Counter of the first entity drawn at or after `since`
fn first_entity_since(slots: &[Option<EntitySlot>; ENTITY_SLOTS], since: u32) -> Option<u32> {
    slots
        .iter()
        .flatten()
        .map(|slot| slot.drawn_at)
        .find(|&drawn| frames_since(drawn, since).is_some())
}

fn derive_timing(
    reset_counter: u32,
    selection: Option<Selection>,
    slots: &[Option<EntitySlot>; ENTITY_SLOTS],
    win_streak: u16,
    tables: &LookupTables,
) -> DerivedTiming {
    let floor = elevator_floor(win_streak);

    let with_shortcut = selection.and_then(|s| frames_since(s.counter, reset_counter));
    let without_shortcut =
        with_shortcut.map(|frames| frames.saturating_sub(tables.elevator_frames_for(floor)));

    let with_narration = selection.and_then(|s| {
        let drawn = first_entity_since(slots, s.counter)?;
        frames_since(drawn, s.counter)
    });
    // A resolved selection always pays the fixed frames; a missing table
    // entry contributes nothing on top
    let without_narration = selection.zip(with_narration).map(|(s, frames)| {
        let narration = tables.narration_frames_for(s.identifier).unwrap_or(0);
        frames
            .saturating_sub(narration)
            .saturating_sub(NARRATION_FIXED_FRAMES)
    });

    DerivedTiming {
        elevator_floor: floor,
        frames_before_selection_with_shortcut: with_shortcut,
        frames_before_selection_without_shortcut: without_shortcut,
        frames_between_selection_and_first_entity_with_narration: with_narration,
        frames_between_selection_and_first_entity_without_narration: without_narration,
    }
}

mod payload_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u32, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(value.to_be_bytes()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        let text = String::deserialize(deserializer)?;
        let mut bytes = [0u8; 4];
        hex::decode_to_slice(&text, &mut bytes).map_err(serde::de::Error::custom)?;
        Ok(u32::from_be_bytes(bytes))
    }
}
