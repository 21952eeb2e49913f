#![no_main]

use cycletrace::config::TraceConfig;
use cycletrace::hooks::{HookBinding, HookKind};
use cycletrace::replay::{parse_records, replay};
use cycletrace::Tracer;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    // Malformed recordings must fail cleanly; well-formed ones must replay
    // without panicking whatever order the events arrive in
    let Ok(records) = parse_records(input) else {
        return;
    };

    let config = TraceConfig {
        hooks: vec![
            HookBinding::new(1, HookKind::SessionReset),
            HookBinding::new(2, HookKind::SessionFinalize),
            HookBinding::new(3, HookKind::SectionOpen),
            HookBinding::new(4, HookKind::SectionPost),
            HookBinding::new(5, HookKind::DivisionOp { signed: true }),
            HookBinding::new(6, HookKind::EntityGenerated),
            HookBinding::new(7, HookKind::SelectionMade),
        ],
        ..TraceConfig::default()
    };
    if let Ok(mut tracer) = Tracer::new(&config) {
        let _ = replay(&mut tracer, &records);
    }
});
