//! Human-readable report summary for the text output format

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::report::Report;
use crate::section::SectionLabel;

/// Aggregate timing for one section label across a report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SectionTotals {
    pub intervals: u64,
    pub retries: u64,
    pub net_cycles: u64,
    pub vblank_cycles: u64,
}

/// Totals per label, sorted by net cycles (descending)
pub fn section_totals(report: &Report) -> Vec<(SectionLabel, SectionTotals)> {
    let mut totals: BTreeMap<SectionLabel, SectionTotals> = BTreeMap::new();
    for interval in report.intervals() {
        let entry = totals.entry(interval.label).or_default();
        entry.intervals += 1;
        entry.net_cycles += interval.net_cycles;
        entry.vblank_cycles += interval.vblank_cycles;
        if interval.is_retry {
            entry.retries += 1;
        }
    }

    let mut sorted: Vec<_> = totals.into_iter().collect();
    sorted.sort_by(|a, b| b.1.net_cycles.cmp(&a.1.net_cycles));
    sorted
}

fn frames(value: Option<u32>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// Render a report as a text table
pub fn render(report: &Report) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "=== Section Timing (net of vblank) ===");
    let _ = writeln!(
        out,
        "{:<10} {:>9} {:>8} {:>14} {:>12}",
        "Section", "Intervals", "Retries", "Net cycles", "Vblank"
    );
    let _ = writeln!(out, "{}", "-".repeat(57));

    let totals = section_totals(report);
    if totals.is_empty() {
        let _ = writeln!(out, "(no sections traced)");
    }
    for (label, t) in &totals {
        let _ = writeln!(
            out,
            "{:<10} {:>9} {:>8} {:>14} {:>12}",
            label.to_string(),
            t.intervals,
            t.retries,
            t.net_cycles,
            t.vblank_cycles
        );
    }
    let _ = writeln!(out, "{}", "-".repeat(57));

    let vblank_total: u64 = report.vblanks().iter().map(|v| v.duration).sum();
    let _ = writeln!(
        out,
        "vblanks: {} ({} cycles)  divisions: {}  anomalies: {}",
        report.vblanks().len(),
        vblank_total,
        report.histograms().total_divisions(),
        report.anomalies()
    );

    let timing = report.timing();
    let _ = writeln!(out);
    let _ = writeln!(out, "=== Derived Timing ===");
    let _ = writeln!(
        out,
        "win streak {} (elevator floor {})  selected: {}",
        report.win_streak(),
        timing.elevator_floor,
        report
            .selected_identifier()
            .map_or_else(|| "-".to_string(), |id| id.to_string())
    );
    let _ = writeln!(
        out,
        "frames before selection:           {:>8} with shortcut, {:>8} without",
        frames(timing.frames_before_selection_with_shortcut),
        frames(timing.frames_before_selection_without_shortcut)
    );
    let _ = writeln!(
        out,
        "frames selection to first entity:  {:>8} with narration, {:>8} without",
        frames(timing.frames_between_selection_and_first_entity_with_narration),
        frames(timing.frames_between_selection_and_first_entity_without_narration)
    );

    out
}

/// Print a report summary to stdout
pub fn print_summary(report: &Report) {
    print!("{}", render(report));
}
