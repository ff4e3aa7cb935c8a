#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Anything accepted must be pure ASCII digits
    if let Ok(digits) = piscan::query::validate_query(data) {
        assert!(!digits.is_empty());
        assert!(digits.iter().all(u8::is_ascii_digit));
    }
});
