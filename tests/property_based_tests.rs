//! Property-based tests for the section tracker and vblank netting
//!
//! Hook streams are generated with strictly increasing cycles; vblank windows
//! are interleaved between section fires.

use cycletrace::encode::{encode, WireFormat};
use cycletrace::section::{SectionLabel, SectionPath, SectionTracker};
use cycletrace::vblank::VblankLedger;
use proptest::prelude::*;

/// One step of a generated stream: a section fire or a vblank window
#[derive(Debug, Clone)]
enum Step {
    Section { path: bool, index: u8, gap: u64 },
    Vblank { lead: u64, duration: u64 },
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => (any::<bool>(), 0u8..4, 1u64..500)
            .prop_map(|(path, index, gap)| Step::Section { path, index, gap }),
        1 => (1u64..100, 1u64..80)
            .prop_map(|(lead, duration)| Step::Vblank { lead, duration }),
    ]
}

struct Outcome {
    tracker: SectionTracker,
    ledger: VblankLedger,
    fires: Vec<SectionLabel>,
    first_fire: Option<u64>,
    end: u64,
}

fn run(steps: &[Step]) -> Outcome {
    let mut tracker = SectionTracker::default();
    let mut ledger = VblankLedger::new();
    let mut fires = Vec::new();
    let mut first_fire = None;
    let mut cycle = 0u64;

    for step in steps {
        match *step {
            Step::Section { path, index, gap } => {
                cycle += gap;
                let path = if path { SectionPath::Post } else { SectionPath::Open };
                let label = SectionLabel::new(path, index);
                tracker.on_hook(label, cycle, &ledger);
                fires.push(label);
                first_fire.get_or_insert(cycle);
            }
            Step::Vblank { lead, duration } => {
                cycle += lead;
                ledger.on_interval_start(cycle);
                cycle += duration;
                ledger.on_interval_end(cycle).unwrap();
            }
        }
    }

    cycle += 1;
    tracker.finalize(cycle, &ledger);
    Outcome {
        tracker,
        ledger,
        fires,
        first_fire,
        end: cycle,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_one_closure_per_fire(steps in prop::collection::vec(step(), 0..60)) {
        let outcome = run(&steps);
        let closed = outcome.tracker.closed();

        // Every fire after the first closes one interval; finalize closes the last
        prop_assert_eq!(closed.len(), outcome.fires.len());

        let label_changes = outcome.fires.windows(2).filter(|w| w[0] != w[1]).count();
        let non_retry = closed.iter().filter(|c| !c.is_retry).count();
        if outcome.fires.is_empty() {
            prop_assert_eq!(non_retry, 0);
        } else {
            prop_assert_eq!(non_retry, label_changes + 1);
        }
    }

    #[test]
    fn prop_retry_iff_next_fire_repeats_label(steps in prop::collection::vec(step(), 1..60)) {
        let outcome = run(&steps);
        let closed = outcome.tracker.closed();

        for (i, interval) in closed.iter().enumerate() {
            prop_assert_eq!(interval.label, outcome.fires[i]);
            let repeats = outcome.fires.get(i + 1) == Some(&outcome.fires[i]);
            prop_assert_eq!(interval.is_retry, repeats);
        }
    }

    #[test]
    fn prop_net_plus_vblank_covers_the_traced_span(steps in prop::collection::vec(step(), 1..60)) {
        let outcome = run(&steps);
        let closed = outcome.tracker.closed();

        for interval in closed {
            prop_assert_eq!(interval.net_cycles + interval.vblank_cycles, interval.raw_cycles());
        }

        // Intervals tile the traced span without gaps
        for pair in closed.windows(2) {
            prop_assert_eq!(pair[0].end_cycle, pair[1].start_cycle);
        }
        if let Some(first) = outcome.first_fire {
            let traced: u64 = closed.iter().map(|c| c.raw_cycles()).sum();
            prop_assert_eq!(traced, outcome.end - first);
        }

        // No interval subtracts more vblank time than the ledger holds
        let subtracted: u64 = closed.iter().map(|c| c.vblank_cycles).sum();
        prop_assert!(subtracted <= outcome.ledger.total_cycles());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_encoding_is_pure(steps in prop::collection::vec(step(), 0..30)) {
        use cycletrace::config::TraceConfig;
        use cycletrace::hooks::{HookBinding, HookKind, RegisterSnapshot};
        use cycletrace::{SnapshotHost, Tracer};

        let config = TraceConfig {
            hooks: vec![
                HookBinding::new(1, HookKind::SessionReset),
                HookBinding::new(2, HookKind::SessionFinalize),
                HookBinding::new(3, HookKind::SectionOpen),
                HookBinding::new(4, HookKind::SectionPost),
            ],
            ..TraceConfig::default()
        };
        let mut tracer = Tracer::new(&config).unwrap();
        let host = SnapshotHost::default();
        let mut cycle = 0u64;

        tracer.on_hook(1, RegisterSnapshot::default(), cycle, &host);
        for step in &steps {
            match *step {
                Step::Section { path, index, gap } => {
                    cycle += gap;
                    let address = if path { 4 } else { 3 };
                    let regs = RegisterSnapshot::new(u32::from(index), 0);
                    tracer.on_hook(address, regs, cycle, &host);
                }
                Step::Vblank { lead, duration } => {
                    cycle += lead;
                    tracer.on_periodic_start(cycle);
                    cycle += duration;
                    tracer.on_periodic_end(cycle);
                }
            }
        }
        let report = tracer
            .on_hook(2, RegisterSnapshot::default(), cycle + 1, &host)
            .unwrap();

        for format in [WireFormat::Json, WireFormat::Packed] {
            let a = encode(&report, format).unwrap();
            let b = encode(&report, format).unwrap();
            prop_assert_eq!(a, b);
        }
    }
}
