#![no_main]

use libfuzzer_sys::fuzz_target;
use cronista::replay::{self, RecordedTrace};

fuzz_target!(|data: &[u8]| {
    // Parse arbitrary bytes as a trace capture and replay whatever parses.
    // Neither step should panic regardless of input; malformed captures and
    // inconsistent event streams must surface as errors.
    if let Ok(trace) = serde_json::from_slice::<RecordedTrace>(data) {
        let _ = replay::replay(trace);
    }
});
