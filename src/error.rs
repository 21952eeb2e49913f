//! Recoverable anomalies raised while consuming hook events
//!
//! Nothing here is fatal. The host is a live emulation that cannot be rolled
//! back, so every variant is logged by the tracer and the session carries on,
//! producing a best-effort report.

use thiserror::Error;

use crate::section::SectionPath;

/// Anomalies observed while tracing a session
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TraceError {
    /// A periodic interval ended without a matching start
    #[error("periodic interval end at cycle {cycle} has no matching start")]
    ProtocolViolation { cycle: u64 },

    /// A section hook carried an index outside the configured range
    #[error("section index {index} on the {path} path is outside 0..{limit}")]
    UnknownLabel {
        path: SectionPath,
        index: u32,
        limit: u8,
    },

    /// The host reported a cycle count lower than one already seen
    #[error("cycle count went backwards: {cycle} after {last}")]
    CycleRegression { cycle: u64, last: u64 },

    /// More entities were generated than the report has slots for
    #[error("entity generated with all {capacity} slots already filled")]
    SlotsExhausted { capacity: usize },
}

pub type Result<T> = std::result::Result<T, TraceError>;
