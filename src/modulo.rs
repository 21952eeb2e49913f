//! Modulo histogram collector
//!
//! Division-routine hooks are tallied per attempt, keyed by the textual
//! `(dividend, signedness, divisor)` triple. When the section tracker closes
//! an interval, the attempt is flushed under the closing label. What happens
//! to the attempt of a retried section is governed by [`RetryPolicy`].

use std::collections::BTreeMap;
use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::hooks::RegisterSnapshot;
use crate::section::{SectionChanged, SectionLabel};

/// Occurrence count per formatted division triple
pub type Histogram = BTreeMap<String, u64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signedness {
    Signed,
    Unsigned,
}

/// One observed call into a division routine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuloEvent {
    pub dividend: u32,
    pub divisor: u32,
    pub signedness: Signedness,
}

impl ModuloEvent {
    pub fn new(dividend: u32, divisor: u32, signedness: Signedness) -> Self {
        Self {
            dividend,
            divisor,
            signedness,
        }
    }

    /// Dividend in register 0, divisor in register 1
    pub fn from_registers(regs: RegisterSnapshot, signed: bool) -> Self {
        let signedness = if signed {
            Signedness::Signed
        } else {
            Signedness::Unsigned
        };
        Self::new(regs.r0, regs.r1, signedness)
    }

    /// Histogram key, e.g. `"37 u 5"` or `"-3 s 7"`
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ModuloEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.signedness {
            Signedness::Signed => write!(
                f,
                "{} s {}",
                self.dividend as i32, self.divisor as i32
            ),
            Signedness::Unsigned => write!(f, "{} u {}", self.dividend, self.divisor),
        }
    }
}

/// What to do with the divisions of an attempt that ended in a retry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum RetryPolicy {
    /// Discard the attempt as noise
    #[default]
    Drop,
    /// Count the attempt toward the section like any other
    Merge,
    /// Keep the attempt in a separate per-section retry aggregate
    Separate,
}

/// Per-section division tallies for a finished session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuloHistograms {
    pub sections: BTreeMap<SectionLabel, Histogram>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub retries: BTreeMap<SectionLabel, Histogram>,
    /// Retry attempts whose divisions were discarded
    pub dropped_attempts: u64,
}

impl ModuloHistograms {
    pub fn section(&self, label: SectionLabel) -> Option<&Histogram> {
        self.sections.get(&label)
    }

    pub fn total_divisions(&self) -> u64 {
        self.sections.values().flat_map(|h| h.values()).sum()
    }
}

/// Accumulates division events between section changes
#[derive(Debug, Clone, Default)]
pub struct ModuloCollector {
    policy: RetryPolicy,
    attempt: Histogram,
    histograms: ModuloHistograms,
}

impl ModuloCollector {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn on_division(&mut self, event: ModuloEvent) {
        *self.attempt.entry(event.key()).or_insert(0) += 1;
    }

    /// Flush the running attempt for the section that just closed
    pub fn on_section_changed(&mut self, change: &SectionChanged) {
        let attempt = std::mem::take(&mut self.attempt);
        if attempt.is_empty() {
            return;
        }

        let target = match (change.is_retry, self.policy) {
            (false, _) | (true, RetryPolicy::Merge) => &mut self.histograms.sections,
            (true, RetryPolicy::Separate) => &mut self.histograms.retries,
            (true, RetryPolicy::Drop) => {
                self.histograms.dropped_attempts += 1;
                trace!(label = %change.old, entries = attempt.len(), "retry attempt dropped");
                return;
            }
        };

        let aggregate = target.entry(change.old).or_default();
        for (key, count) in attempt {
            *aggregate.entry(key).or_insert(0) += count;
        }
    }

    /// Divisions seen since the last section change
    pub fn pending(&self) -> &Histogram {
        &self.attempt
    }

    pub fn histograms(&self) -> &ModuloHistograms {
        &self.histograms
    }
}
