//! Section tracker
//!
//! Hooks only tell us "execution reached this location". There is no return
//! event, so a section is taken to run from one section hook to the next:
//!
//! ```text
//! hook A ──────────── hook B ──────── hook B ────────── finalize
//!   │   interval A      │ interval B    │  interval B'       │
//!   │   (new section)   │ (retry)       │  (closed at end)   │
//! ```
//!
//! A fire with the same label as the open interval means the previous attempt
//! was rejected and recomputed, so that interval is closed as a retry. Cycles
//! spent inside vblank windows are subtracted from every interval using the
//! ledger cursor sampled at open and close.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::CycleCount;
use crate::error::{Result, TraceError};
use crate::vblank::VblankLedger;

/// Default number of section indices per path
pub const DEFAULT_SECTION_COUNT: u8 = 8;

/// The two hook namespaces a section label can come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionPath {
    Open,
    Post,
}

impl fmt::Display for SectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionPath::Open => write!(f, "open"),
            SectionPath::Post => write!(f, "post"),
        }
    }
}

/// Stable tag identifying a logical computation phase
///
/// Serialized as `"<path>:<index>"` so it can key JSON maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct SectionLabel {
    pub path: SectionPath,
    pub index: u8,
}

impl SectionLabel {
    pub fn new(path: SectionPath, index: u8) -> Self {
        Self { path, index }
    }
}

impl fmt::Display for SectionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path, self.index)
    }
}

impl FromStr for SectionLabel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (path, index) = s
            .split_once(':')
            .ok_or_else(|| format!("section label '{}' is missing ':'", s))?;
        let path = match path {
            "open" => SectionPath::Open,
            "post" => SectionPath::Post,
            other => return Err(format!("unknown section path '{}'", other)),
        };
        let index = index
            .parse::<u8>()
            .map_err(|e| format!("invalid section index '{}': {}", index, e))?;
        Ok(Self { path, index })
    }
}

impl From<SectionLabel> for String {
    fn from(label: SectionLabel) -> Self {
        label.to_string()
    }
}

impl TryFrom<String> for SectionLabel {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

/// The single interval currently being measured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenInterval {
    pub label: SectionLabel,
    pub start_cycle: CycleCount,
    pub vblank_count_at_start: usize,
}

/// A measured interval, immutable once appended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosedInterval {
    pub label: SectionLabel,
    pub start_cycle: CycleCount,
    pub end_cycle: CycleCount,
    /// Cycles spent inside vblank windows during the interval
    pub vblank_cycles: u64,
    /// Raw span minus `vblank_cycles`
    pub net_cycles: u64,
    pub is_retry: bool,
}

impl ClosedInterval {
    pub fn raw_cycles(&self) -> u64 {
        self.end_cycle.saturating_sub(self.start_cycle)
    }
}

/// Emitted every time an interval closes
///
/// `new` is `None` when the close came from finalize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionChanged {
    pub old: SectionLabel,
    pub new: Option<SectionLabel>,
    pub is_retry: bool,
}

/// State machine turning section hook fires into closed intervals
#[derive(Debug, Clone)]
pub struct SectionTracker {
    section_count: u8,
    open: Option<OpenInterval>,
    closed: Vec<ClosedInterval>,
}

impl Default for SectionTracker {
    fn default() -> Self {
        Self::new(DEFAULT_SECTION_COUNT)
    }
}

impl SectionTracker {
    pub fn new(section_count: u8) -> Self {
        Self {
            section_count,
            open: None,
            closed: Vec::new(),
        }
    }

    /// Resolve a raw register index into a label, rejecting out-of-range values
    pub fn label(&self, path: SectionPath, raw_index: u32) -> Result<SectionLabel> {
        match u8::try_from(raw_index) {
            Ok(index) if index < self.section_count => Ok(SectionLabel::new(path, index)),
            _ => Err(TraceError::UnknownLabel {
                path,
                index: raw_index,
                limit: self.section_count,
            }),
        }
    }

    /// Handle a section hook fire
    ///
    /// Closes the open interval (as a retry when the label repeats) and opens
    /// a fresh one for `label`. Returns the change event for the closure, or
    /// `None` when this is the first interval of the session.
    pub fn on_hook(
        &mut self,
        label: SectionLabel,
        cycle_now: CycleCount,
        ledger: &VblankLedger,
    ) -> Option<SectionChanged> {
        let change = self.open.take().map(|open| {
            let is_retry = open.label == label;
            self.close(open, cycle_now, ledger, is_retry);
            SectionChanged {
                old: open.label,
                new: Some(label),
                is_retry,
            }
        });

        self.open = Some(OpenInterval {
            label,
            start_cycle: cycle_now,
            vblank_count_at_start: ledger.count(),
        });

        change
    }

    /// Close whatever interval is still open, never as a retry
    pub fn finalize(
        &mut self,
        cycle_now: CycleCount,
        ledger: &VblankLedger,
    ) -> Option<SectionChanged> {
        let open = self.open.take()?;
        self.close(open, cycle_now, ledger, false);
        Some(SectionChanged {
            old: open.label,
            new: None,
            is_retry: false,
        })
    }

    fn close(
        &mut self,
        open: OpenInterval,
        cycle_now: CycleCount,
        ledger: &VblankLedger,
        is_retry: bool,
    ) {
        let raw = cycle_now.saturating_sub(open.start_cycle);
        let vblank_cycles = ledger.cycles_in(open.vblank_count_at_start, ledger.count());
        let net_cycles = raw.saturating_sub(vblank_cycles);

        debug!(
            label = %open.label,
            raw,
            vblank_cycles,
            net_cycles,
            is_retry,
            "section interval closed"
        );

        self.closed.push(ClosedInterval {
            label: open.label,
            start_cycle: open.start_cycle,
            end_cycle: cycle_now,
            vblank_cycles,
            net_cycles,
            is_retry,
        });
    }

    pub fn current(&self) -> Option<SectionLabel> {
        self.open.map(|open| open.label)
    }

    pub fn open_interval(&self) -> Option<&OpenInterval> {
        self.open.as_ref()
    }

    pub fn closed(&self) -> &[ClosedInterval] {
        &self.closed
    }
}
