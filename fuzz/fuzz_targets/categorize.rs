#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let data = if data.len() > 16 * 1024 {
        &data[..16 * 1024]
    } else {
        data
    };
    let raw = String::from_utf8_lossy(data);

    let issue = crdgate_core::categorize(&raw, "fuzz.ctx");
    assert!(issue
        .message
        .starts_with(&format!("{} (fuzz.ctx): ", issue.kind.label())));
    assert_eq!(issue.severity, crdgate_core::severity(&raw));
});
