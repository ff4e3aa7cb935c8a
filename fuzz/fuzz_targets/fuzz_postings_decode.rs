#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Corrupt postings must be rejected, never panic
    if let Some(offsets) = piscan::utils::delta_decode(data) {
        assert!(offsets.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(piscan::utils::delta_first(data), offsets.first().copied());
    }
});
