//! Fuzz target: pushed desired-state documents
//!
//! Feeds arbitrary bytes through the MQTT payload decoder and the
//! desired-state merge, asserting that whatever arrives the merged
//! configuration is always one the loop can run with:
//! - telemetry interval inside its clamp range
//! - both setpoints legal for the domain
//!
//! cargo fuzz run fuzz_desired_document

#![no_main]

use climate_agent::adapters::mqtt::decode_desired;
use climate_agent::desired::{
    DesiredConfig, MAX_TELEMETRY_INTERVAL_SECS, MIN_TELEMETRY_INTERVAL_SECS,
};
use climate_agent::setpoint::SetpointDomain;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some(doc) = decode_desired(data) else {
        return;
    };
    for supports_cooling in [true, false] {
        let domain = SetpointDomain { supports_cooling };
        let config = DesiredConfig::merge(&doc, &domain);
        assert!(
            (MIN_TELEMETRY_INTERVAL_SECS..=MAX_TELEMETRY_INTERVAL_SECS)
                .contains(&config.telemetry_interval_secs)
        );
        assert!(domain.is_legal(config.set_point));
        assert!(domain.is_legal(config.fallback_set_point));

        // The persisted form must merge back to the same configuration.
        assert_eq!(DesiredConfig::merge(&config.to_document(), &domain), config);
    }
});
