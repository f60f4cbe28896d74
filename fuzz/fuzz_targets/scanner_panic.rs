#![no_main]
use libfuzzer_sys::fuzz_target;
use m2svg_scan::{RecoveryPolicy, RenderOutcome, ScanOptions, scan_with};

fuzz_target!(|data: &[u8]| {
    // Lossy conversion keeps inputs that are "almost" text in play.
    let s = String::from_utf8_lossy(data);
    let options = ScanOptions {
        policy: RecoveryPolicy::Literal,
        inline_faults: false,
    };
    let result = scan_with(&s, options, |span| RenderOutcome::Rendered(span.source()));
    assert_eq!(result.output, s);
});
