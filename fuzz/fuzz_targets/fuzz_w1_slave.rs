//! Fuzz target: DS18B20 `w1_slave` parsing
//!
//! The kernel file is read as text and may be truncated mid-write, so the
//! parser sees arbitrary fragments.  It must never panic, and anything it
//! accepts must be a finite temperature.
//!
//! cargo fuzz run fuzz_w1_slave

#![no_main]

use climate_agent::sensors::temperature::parse_w1_slave;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    if let Some(celsius) = parse_w1_slave(&text) {
        assert!(celsius.is_finite());
    }
});
