//! Fuzz target for annotation XML parsing.
//!
//! Feeds arbitrary bytes to the annotation parser, checking for panics,
//! crashes, or hangs.

#![no_main]

use libfuzzer_sys::fuzz_target;
use maskpack::annotation::from_annotation_slice;

fuzz_target!(|data: &[u8]| {
    // Cap input size to avoid excessive memory usage.
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let _ = from_annotation_slice(data);
});
