//! Fuzz target for container header and label-table validation.

#![no_main]

use libfuzzer_sys::fuzz_target;
use maskpack::container::validate_container_bytes;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let _ = validate_container_bytes(data);
});
