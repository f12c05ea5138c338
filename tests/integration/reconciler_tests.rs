//! Integration tests for the Reconciler → actuator / cloud pipeline.
//!
//! These drive the full loop against mock hardware, a mock cloud and a
//! simulated clock, so hours of agent time run in microseconds.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::{Value, json};

use climate_agent::adapters::time::SimClock;
use climate_agent::adapters::weather::WeatherCache;
use climate_agent::app::inbox::ConfigInbox;
use climate_agent::app::ports::{Clock, NoWeather, Wake};
use climate_agent::app::reports::WeatherReading;
use climate_agent::app::service::{LoopSettings, Reconciler};
use climate_agent::control::actuator::IrCode;
use climate_agent::desired::DesiredStore;
use climate_agent::scheduler::{FallbackPolicy, FallbackState};
use climate_agent::setpoint::{SetpointDomain, validate};

use crate::mock_hw::{Harness, MemoryStore, MockCloud, MockHardware, local};

// ── Boot ──────────────────────────────────────────────────────

#[test]
fn boot_applies_defaults_and_reports() {
    let h = Harness::booted(MockHardware::steady(21.0));
    assert_eq!(h.sent(), &[IrCode::PowerOn, IrCode::Heat(21)]);
    assert_eq!(h.states().len(), 1);
    let state = &h.states()[0];
    assert_eq!(state.set_point, 21);
    assert_eq!(state.telemetry_interval, 1200);
    assert!(!state.fallback_armed);
    assert_eq!(state.actuator_code.as_deref(), Some("HEAT_HIGH_21"));
    assert_eq!(h.agent.window_capacity(), 120);
}

#[test]
fn boot_restores_persisted_configuration() {
    let store = MemoryStore::with_record(json!({"tempSetPoint": 123, "telemetryInterval": 300}));
    let mut h = Harness::with_store(MockHardware::steady(21.0), store);
    h.agent.boot().unwrap();
    assert_eq!(h.sent(), &[IrCode::PowerOn, IrCode::Cool(23)]);
    assert_eq!(h.agent.window_capacity(), 30);
}

// ── End-to-end: push, reconcile, fallback ─────────────────────

#[test]
fn push_then_fallback_end_to_end() {
    let mut h = Harness::booted(MockHardware::steady(21.0));
    h.push(json!({"telemetryInterval": 60, "tempSetPoint": 21, "fallbackDate": "2099-01-01"}));

    h.agent.run_cycle();
    assert_eq!(h.agent.actuator().state().last_commanded, Some(validate(21)));
    assert_eq!(h.agent.hw().count(IrCode::Heat(21)), 1, "unchanged setpoint must not be re-sent");
    assert_eq!(h.agent.window_capacity(), 6);
    assert!(matches!(h.agent.fallback_state(), FallbackState::Armed { .. }));
    assert!(h.agent.cloud().last_state().unwrap().fallback_armed);

    let before = h.states().len();
    h.clock.set(local(2099, 1, 1, 0, 0, 1));
    h.agent.run_cycle();

    let fallback = validate(h.agent.desired().fallback_set_point);
    assert_eq!(h.agent.desired().set_point, fallback);
    assert_eq!(h.agent.actuator().state().last_commanded, Some(fallback));
    assert_eq!(h.agent.stats().fallbacks_fired, 1);

    let emitted = &h.states()[before..];
    assert_eq!(emitted.len(), 1, "exactly one fallback report");
    assert_eq!(emitted[0].set_point, fallback);
    assert!(!emitted[0].fallback_armed);

    for _ in 0..5 {
        h.agent.run_cycle();
    }
    assert_eq!(h.agent.stats().fallbacks_fired, 1);
    assert_eq!(h.agent.fallback_state(), FallbackState::Unarmed);
    assert_eq!(h.agent.hw().count(IrCode::LowHeat), 1);
    assert_eq!(h.store.saved().unwrap()["tempSetPoint"], fallback);
}

#[test]
fn fallback_date_older_than_update_time_never_fires() {
    let mut h = Harness::booted(MockHardware::steady(21.0));
    h.push(json!({
        "tempSetPoint": 22,
        "fallbackDate": "2024-01-01",
        "updateTime": "2024-06-01T10:00:00"
    }));
    h.agent.run_cycle();
    assert_eq!(h.agent.fallback_state(), FallbackState::Unarmed);

    h.clock.set(local(2030, 1, 1, 0, 0, 0));
    h.agent.run_cycle();
    assert_eq!(h.agent.stats().fallbacks_fired, 0);
    assert_eq!(h.agent.desired().set_point, 22);
}

#[test]
fn redelivered_revision_does_not_undo_fallback() {
    let mut h = Harness::booted(MockHardware::steady(21.0));
    let doc = json!({
        "tempSetPoint": 22,
        "fallbackDate": "2099-01-01",
        "updateTime": "2024-06-01T10:00:00"
    });
    h.push(doc.clone());
    h.agent.run_cycle();
    h.clock.set(local(2099, 1, 2, 0, 0, 0));
    h.agent.run_cycle();
    assert_eq!(h.agent.desired().set_point, 10);

    h.push(doc);
    h.agent.run_cycle();
    assert_eq!(h.agent.desired().set_point, 10);
    assert_eq!(h.agent.fallback_state(), FallbackState::Unarmed);
    assert_eq!(h.agent.stats().fallbacks_fired, 1);
}

#[test]
fn new_revision_after_fallback_rearms() {
    let mut h = Harness::booted(MockHardware::steady(21.0));
    h.push(json!({"fallbackDate": "2099-01-01", "updateTime": "2024-06-01T10:00:00"}));
    h.agent.run_cycle();
    h.clock.set(local(2099, 1, 2, 0, 0, 0));
    h.agent.run_cycle();
    assert_eq!(h.agent.stats().fallbacks_fired, 1);

    h.push(json!({
        "tempSetPoint": 20,
        "fallbackDate": "2099-06-01",
        "updateTime": "2099-01-02T08:00:00"
    }));
    h.agent.run_cycle();
    assert_eq!(h.agent.desired().set_point, 20);
    assert!(matches!(h.agent.fallback_state(), FallbackState::Armed { .. }));
    assert_eq!(h.agent.actuator().state().last_commanded, Some(20));
}

#[test]
fn reboot_after_fallback_does_not_fire_again() {
    let mut h = Harness::booted(MockHardware::steady(21.0));
    h.push(json!({"fallbackDate": "2099-01-01", "updateTime": "2024-06-01T10:00:00"}));
    h.agent.run_cycle();
    h.clock.set(local(2099, 1, 2, 0, 0, 0));
    h.agent.run_cycle();
    assert_eq!(h.agent.stats().fallbacks_fired, 1);

    let mut rebooted = Harness::with_store(MockHardware::steady(21.0), h.store.clone());
    rebooted.clock.set(local(2099, 1, 2, 6, 0, 0));
    rebooted.agent.boot().unwrap();
    assert_eq!(rebooted.agent.desired().set_point, 10);
    assert_eq!(rebooted.agent.fallback_state(), FallbackState::Unarmed);
    assert!(!rebooted.states()[0].fallback_armed);

    for _ in 0..3 {
        rebooted.agent.run_cycle();
    }
    assert_eq!(rebooted.agent.stats().fallbacks_fired, 0);
    assert_eq!(rebooted.agent.actuator().state().last_commanded, Some(10));
}

#[test]
fn stale_contact_policy_waits_for_lapse() {
    let settings = LoopSettings {
        fallback: FallbackPolicy {
            require_stale_contact: true,
            stale_contact_minutes: 30,
        },
        ..LoopSettings::default()
    };
    let mut h = Harness::build(MockHardware::steady(21.0), MemoryStore::default(), settings);
    h.agent.boot().unwrap();
    h.push(json!({"telemetryInterval": 60, "fallbackDate": "2099-01-01"}));
    h.agent.run_cycle();

    h.clock.set(local(2099, 1, 1, 6, 0, 0));
    for _ in 0..5 {
        h.agent.run_cycle();
    }
    assert_eq!(h.agent.stats().fallbacks_fired, 0, "cloud still reachable");

    h.agent.cloud_mut().offline = true;
    let went_offline = h.clock.now();
    for _ in 0..60 {
        h.agent.run_cycle();
        if h.agent.stats().fallbacks_fired > 0 {
            break;
        }
    }
    assert_eq!(h.agent.stats().fallbacks_fired, 1);
    assert!(h.clock.now() - went_offline >= TimeDelta::minutes(30));
    assert_eq!(h.agent.desired().set_point, 10);
}

// ── Alerts and the interruptible sleep ────────────────────────

#[test]
fn alert_ends_sleep_within_one_sampling_period() {
    let mut h = Harness::booted(MockHardware::scripted(&[21.0, 3.0]));
    let start = h.clock.now();
    h.agent.run_cycle();

    assert!(h.agent.is_alerting());
    assert_eq!(h.clock.now() - start, TimeDelta::seconds(10));
    let last = h.agent.cloud().last_state().unwrap();
    assert!(last.alert);
    assert_eq!(h.states().len(), 2);
}

#[test]
fn alert_hysteresis_holds_near_boundary() {
    // Window of one sample makes monitored == raw.
    let store = MemoryStore::with_record(json!({"telemetryInterval": 30}));
    let settings = LoopSettings {
        sampling_period: Duration::from_secs(30),
        ..LoopSettings::default()
    };
    let hw = MockHardware::scripted(&[6.5, 7.5, 7.5, 8.5]);
    let mut h = Harness::build(hw, store, settings);
    h.agent.boot().unwrap();
    assert_eq!(h.agent.window_capacity(), 1);

    h.agent.run_cycle(); // 6.5 raises; sleep sample 7.5 holds
    assert!(h.agent.is_alerting());
    h.agent.run_cycle(); // 7.5 holds; sleep sample 8.5 clears
    assert!(!h.agent.is_alerting());

    let flips: Vec<bool> = h.states().iter().map(|s| s.alert).collect();
    assert_eq!(flips, vec![false, true, false]);
}

#[test]
fn telemetry_carries_monitored_and_raw() {
    let mut h = Harness::booted(MockHardware::scripted(&[21.04]));
    h.agent.run_cycle();
    let t = &h.agent.cloud().telemetry[0];
    assert!((t.temp_current - 21.0).abs() < 1e-4);
    assert!((t.temp_raw - 21.0).abs() < 1e-4);
    assert_eq!(t.set_point, 21);
    assert!(!t.alert);
    assert!(t.outdoor.is_none());
}

#[test]
fn telemetry_carries_cached_outdoor_weather() {
    let weather = WeatherCache::new();
    let desired = DesiredStore::boot(Box::new(MemoryStore::default()), SetpointDomain::default());
    let mut agent = Reconciler::new(
        MockHardware::steady(21.0),
        MockCloud::default(),
        weather.clone(),
        SimClock::starting_at(local(2024, 6, 1, 12, 0, 0)),
        desired,
        Arc::new(ConfigInbox::new()),
        LoopSettings::default(),
    );
    agent.boot().unwrap();
    agent.run_cycle();
    assert!(agent.cloud().telemetry[0].outdoor.is_none());

    let reading = WeatherReading {
        temp: -3.5,
        wind: 4.0,
        fetched_utctime: Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap(),
    };
    weather.store(reading.clone());
    agent.run_cycle();
    assert_eq!(agent.cloud().telemetry.len(), 2);
    assert_eq!(agent.cloud().telemetry[1].outdoor, Some(reading));
}

/// Simulated clock that pushes a document into the inbox on its n-th sleep.
struct PushingClock {
    inner: SimClock,
    sleeps: AtomicU32,
    plan: Mutex<Option<(u32, Value)>>,
}

impl Clock for PushingClock {
    fn now(&self) -> DateTime<Local> {
        self.inner.now()
    }

    fn sleep(&self, inbox: &ConfigInbox, period: Duration) -> Wake {
        let n = self.sleeps.fetch_add(1, Ordering::SeqCst) + 1;
        let mut plan = self.plan.lock();
        if plan.as_ref().is_some_and(|(at, _)| *at == n) {
            if let Some((_, doc)) = plan.take() {
                inbox.push(doc);
            }
        }
        self.inner.sleep(inbox, period)
    }
}

#[test]
fn push_interrupts_sleep_and_applies_next_cycle() {
    let sim = SimClock::starting_at(local(2024, 6, 1, 12, 0, 0));
    let clock = PushingClock {
        inner: sim.clone(),
        sleeps: AtomicU32::new(0),
        plan: Mutex::new(Some((3, json!({"tempSetPoint": 24})))),
    };
    let inbox = Arc::new(ConfigInbox::new());
    let store = DesiredStore::boot(Box::new(MemoryStore::default()), SetpointDomain::default());
    let mut agent = Reconciler::new(
        MockHardware::steady(21.0),
        MockCloud::default(),
        NoWeather,
        clock,
        store,
        Arc::clone(&inbox),
        LoopSettings::default(),
    );
    agent.boot().unwrap();

    let start = sim.now();
    agent.run_cycle();
    assert_eq!(sim.now() - start, TimeDelta::seconds(20), "woken on third step");
    assert_eq!(agent.desired().set_point, 21);

    agent.run_cycle();
    assert_eq!(agent.desired().set_point, 24);
    assert_eq!(agent.actuator().state().last_commanded, Some(24));
}

// ── Failure handling ──────────────────────────────────────────

#[test]
fn unpersisted_push_keeps_previous_configuration() {
    let mut h = Harness::booted(MockHardware::steady(21.0));
    h.store.set_failing(true);
    h.push(json!({"tempSetPoint": 25}));
    h.agent.run_cycle();

    assert_eq!(h.agent.desired().set_point, 21);
    assert_eq!(h.agent.hw().count(IrCode::Heat(25)), 0);
    assert_eq!(h.agent.stats().failed_cycles, 0);
}

#[test]
fn ir_failure_fails_cycle_then_recovers() {
    let mut h = Harness::booted(MockHardware::steady(21.0));
    h.agent.hw_mut().fail_ir = true;
    h.push(json!({"tempSetPoint": 23}));
    let start = h.clock.now();
    h.agent.run_cycle();

    assert_eq!(h.agent.stats().failed_cycles, 1);
    assert_eq!(h.agent.desired().set_point, 23);
    assert_eq!(h.agent.actuator().state().last_commanded, Some(21));
    assert!(h.clock.now() > start, "failed cycle still sleeps");

    h.agent.hw_mut().fail_ir = false;
    h.agent.run_cycle();
    assert_eq!(h.agent.stats().failed_cycles, 1);
    assert_eq!(h.agent.actuator().state().last_commanded, Some(23));
    assert_eq!(h.agent.hw().count(IrCode::Heat(23)), 1);
}

#[test]
fn offline_cloud_never_stamps_contact() {
    let mut h = Harness::new(MockHardware::steady(21.0));
    h.agent.cloud_mut().offline = true;
    h.agent.boot().unwrap();
    h.agent.run_cycle();
    assert!(h.agent.last_contact().is_none());
    assert_eq!(h.agent.stats().states_reported, 0);
    assert_eq!(h.agent.stats().cycles, 1);
}

#[test]
fn shutdown_stops_run() {
    let mut h = Harness::new(MockHardware::steady(21.0));
    h.inbox.request_shutdown();
    h.agent.run();
    assert_eq!(h.agent.stats().cycles, 0);
    assert_eq!(h.states().len(), 1, "boot report still sent");
}
