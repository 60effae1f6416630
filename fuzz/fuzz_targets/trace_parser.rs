#![no_main]

use huella::replay::parse_line;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Convert arbitrary bytes to UTF-8 string (lossy conversion)
    if let Ok(input) = std::str::from_utf8(data) {
        // Attempt to parse the trace line
        // This should not panic regardless of input
        let _ = parse_line(input);
    }
});
