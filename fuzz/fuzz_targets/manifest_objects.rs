#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let data = if data.len() > 64 * 1024 {
        &data[..64 * 1024]
    } else {
        data
    };
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let Ok(objects) = crdgate_core::manifest_objects(text, "fuzz-release-manifest") else {
        return;
    };
    for obj in objects.iter().filter(|o| o.is_crd()) {
        let _ = obj.to_crd();
    }
});
