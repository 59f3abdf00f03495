#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let header = match pfs0_core::Header::new(data) {
        Ok(header) => header,
        Err(_) => return,
    };

    // Offsets come straight from the input, so every lookup must fail
    // cleanly instead of reading out of bounds
    if let Ok(entries) = header.entries(data) {
        for entry in entries {
            let _ = header.name(data, entry);
        }
    }
    let _ = header.total_size();
});
