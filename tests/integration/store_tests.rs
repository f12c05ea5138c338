//! Desired-state persistence across simulated reboots.

use serde_json::json;

use climate_agent::adapters::file_store::FileConfigStore;
use climate_agent::desired::{DEFAULT_SET_POINT, DesiredConfig, DesiredStore};
use climate_agent::setpoint::SetpointDomain;

fn boot(path: &std::path::Path) -> DesiredStore {
    DesiredStore::boot(Box::new(FileConfigStore::new(path)), SetpointDomain::default())
}

#[test]
fn adopted_configuration_survives_reboot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("desired_state.json");

    let mut store = boot(&path);
    assert_eq!(store.current(), &DesiredConfig::default());
    store
        .adopt(&json!({
            "telemetryInterval": 300,
            "tempSetPoint": 124,
            "fallbackDate": "2099-01-01",
            "location": "attic",
            "updateTime": "2024-06-01T10:00:00"
        }))
        .unwrap();
    let before = store.current().clone();
    drop(store);

    let rebooted = boot(&path);
    assert_eq!(rebooted.current(), &before);
    assert_eq!(rebooted.current().set_point, 124);
    assert_eq!(rebooted.current().location.as_deref(), Some("attic"));
}

#[test]
fn fallback_override_survives_reboot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("desired_state.json");

    let mut store = boot(&path);
    store.adopt(&json!({"tempSetPoint": 24})).unwrap();
    assert_eq!(store.apply_fallback(10), 10);
    drop(store);

    let rebooted = boot(&path);
    assert_eq!(rebooted.current().set_point, 10);
    assert!(rebooted.current().fallback_fired);
}

#[test]
fn corrupted_file_boots_with_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("desired_state.json");
    std::fs::write(&path, b"{ not json").unwrap();

    let store = boot(&path);
    assert_eq!(store.current().set_point, DEFAULT_SET_POINT);
}

#[test]
fn unwritable_location_keeps_previous_configuration() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing-dir").join("desired_state.json");

    let mut store = boot(&path);
    assert!(store.adopt(&json!({"tempSetPoint": 25})).is_err());
    assert_eq!(store.current().set_point, DEFAULT_SET_POINT);
}
