#![no_main]

use libfuzzer_sys::fuzz_target;
use revscan::ingest::{ingest_rows, read_rows};
use revscan::text::TextNormalizer;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Reading and validating must never panic, whatever the input
        if let Ok(rows) = read_rows(input) {
            if let Ok(normalizer) = TextNormalizer::new() {
                let _ = ingest_rows(&rows, &normalizer);
            }
        }
    }
});
