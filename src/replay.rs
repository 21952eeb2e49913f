//! Replay of recorded hook streams
//!
//! A recording is JSON Lines, one event per line:
//!
//! ```text
//! # comment lines and blank lines are skipped
//! {"event":"hook","address":16,"cycle":0,"counter":1200}
//! {"event":"hook","address":32,"regs":[2,0],"cycle":100}
//! {"event":"vblank_start","cycle":150}
//! {"event":"vblank_end","cycle":170}
//! {"event":"memory","win_streak":21}
//! ```
//!
//! `counter` on a hook record is the frame counter the host would report at
//! that moment; `memory` records update values read at finalize.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::clock::SnapshotHost;
use crate::hooks::RegisterSnapshot;
use crate::report::Report;
use crate::tracer::Tracer;

/// One recorded host event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceRecord {
    Hook {
        address: u32,
        #[serde(default)]
        regs: [u32; 2],
        cycle: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        counter: Option<u32>,
    },
    VblankStart {
        cycle: u64,
    },
    VblankEnd {
        cycle: u64,
    },
    Memory {
        win_streak: u16,
    },
}

/// Parse a recording, failing on the first malformed line
pub fn parse_records(input: &str) -> Result<Vec<TraceRecord>> {
    input
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(idx, line)| {
            serde_json::from_str(line.trim())
                .with_context(|| format!("invalid trace record on line {}", idx + 1))
        })
        .collect()
}

/// Read and parse a recording from disk
pub fn load(path: &Path) -> Result<Vec<TraceRecord>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read trace file {}", path.display()))?;
    parse_records(&text).with_context(|| format!("failed to parse {}", path.display()))
}

/// Drive a tracer with recorded events, collecting every finalized report
pub fn replay(tracer: &mut Tracer, records: &[TraceRecord]) -> Vec<Report> {
    let mut host = SnapshotHost::default();
    let mut reports = Vec::new();

    for record in records {
        match *record {
            TraceRecord::Hook {
                address,
                regs,
                cycle,
                counter,
            } => {
                if let Some(counter) = counter {
                    host.counter = counter;
                }
                let regs = RegisterSnapshot::from(regs);
                if let Some(report) = tracer.on_hook(address, regs, cycle, &host) {
                    reports.push(report);
                }
            }
            TraceRecord::VblankStart { cycle } => tracer.on_periodic_start(cycle),
            TraceRecord::VblankEnd { cycle } => tracer.on_periodic_end(cycle),
            TraceRecord::Memory { win_streak } => host.win_streak = win_streak,
        }
    }

    reports
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_record_kinds() {
        let records = parse_records(
            r#"
            # recorded session
            {"event":"hook","address":16,"cycle":0,"counter":5}
            {"event":"hook","address":32,"regs":[2,9],"cycle":100}

            {"event":"vblank_start","cycle":150}
            {"event":"vblank_end","cycle":170}
            {"event":"memory","win_streak":21}
            "#,
        )
        .unwrap();

        assert_eq!(records.len(), 5);
        assert_eq!(
            records[0],
            TraceRecord::Hook {
                address: 16,
                regs: [0, 0],
                cycle: 0,
                counter: Some(5)
            }
        );
        assert_eq!(
            records[1],
            TraceRecord::Hook {
                address: 32,
                regs: [2, 9],
                cycle: 100,
                counter: None
            }
        );
        assert_eq!(records[4], TraceRecord::Memory { win_streak: 21 });
    }

    #[test]
    fn test_parse_error_names_line() {
        let err = parse_records("{\"event\":\"vblank_start\",\"cycle\":1}\n{\"event\":\"warp\"}\n")
            .unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load(Path::new("/nonexistent/session.jsonl")).unwrap_err();
        assert!(err.to_string().contains("failed to read trace file"));
    }
}
