//! Mock adapters for integration tests.
//!
//! Records every IR code and every cloud record so tests can assert on
//! the full history without touching real hardware or a broker.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Local, TimeZone};
use parking_lot::Mutex;
use serde_json::Value;

use climate_agent::adapters::time::SimClock;
use climate_agent::app::inbox::ConfigInbox;
use climate_agent::app::ports::{
    CloudPort, ConfigError, ConfigPort, IrPort, NoWeather, TemperaturePort,
};
use climate_agent::app::reports::{ReportedState, TelemetryRecord};
use climate_agent::app::service::{LoopSettings, Reconciler};
use climate_agent::control::actuator::IrCode;
use climate_agent::desired::DesiredStore;
use climate_agent::error::ActuatorError;
use climate_agent::setpoint::SetpointDomain;

// ── MockHardware ──────────────────────────────────────────────

/// Scripted thermometer plus recording IR transmitter.
pub struct MockHardware {
    /// Readings handed out in order; the last one repeats.
    pub script: VecDeque<f32>,
    pub steady: f32,
    pub sent: Vec<IrCode>,
    pub fail_ir: bool,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn steady(celsius: f32) -> Self {
        Self {
            script: VecDeque::new(),
            steady: celsius,
            sent: Vec::new(),
            fail_ir: false,
        }
    }

    /// `readings` in order, then the last one forever.
    pub fn scripted(readings: &[f32]) -> Self {
        let steady = readings.last().copied().unwrap_or(21.0);
        Self {
            script: readings.iter().copied().collect(),
            ..Self::steady(steady)
        }
    }

    pub fn count(&self, code: IrCode) -> usize {
        self.sent.iter().filter(|c| **c == code).count()
    }
}

impl TemperaturePort for MockHardware {
    fn read_raw(&mut self) -> f32 {
        self.script.pop_front().unwrap_or(self.steady)
    }
}

impl IrPort for MockHardware {
    fn transmit(&mut self, code: IrCode) -> Result<(), ActuatorError> {
        if self.fail_ir {
            return Err(ActuatorError::TransmitFailed);
        }
        self.sent.push(code);
        Ok(())
    }
}

// ── MockCloud ─────────────────────────────────────────────────

#[derive(Default)]
pub struct MockCloud {
    pub states: Vec<ReportedState>,
    pub telemetry: Vec<TelemetryRecord>,
    pub offline: bool,
}

#[allow(dead_code)]
impl MockCloud {
    pub fn last_state(&self) -> Option<&ReportedState> {
        self.states.last()
    }
}

impl CloudPort for MockCloud {
    fn report_state(&mut self, state: &ReportedState) -> bool {
        if self.offline {
            return false;
        }
        self.states.push(state.clone());
        true
    }

    fn report_telemetry(&mut self, record: &TelemetryRecord) -> bool {
        if self.offline {
            return false;
        }
        self.telemetry.push(record.clone());
        true
    }
}

// ── MemoryStore ───────────────────────────────────────────────

/// In-memory [`ConfigPort`]; clones share the record.
#[derive(Clone, Default)]
pub struct MemoryStore {
    pub record: Arc<Mutex<Option<Value>>>,
    pub fail_saves: Arc<AtomicBool>,
}

#[allow(dead_code)]
impl MemoryStore {
    pub fn with_record(record: Value) -> Self {
        let store = Self::default();
        *store.record.lock() = Some(record);
        store
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_saves.store(failing, Ordering::SeqCst);
    }

    pub fn saved(&self) -> Option<Value> {
        self.record.lock().clone()
    }
}

impl ConfigPort for MemoryStore {
    fn load(&self) -> Result<Value, ConfigError> {
        self.record.lock().clone().ok_or(ConfigError::NotFound)
    }

    fn save(&self, record: &Value) -> Result<(), ConfigError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(ConfigError::IoError);
        }
        *self.record.lock() = Some(record.clone());
        Ok(())
    }
}

// ── Harness ───────────────────────────────────────────────────

pub type TestReconciler = Reconciler<MockHardware, MockCloud, NoWeather, SimClock>;

pub struct Harness {
    pub agent: TestReconciler,
    pub clock: SimClock,
    pub inbox: Arc<ConfigInbox>,
    pub store: MemoryStore,
}

#[allow(dead_code)]
pub fn local(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Local> {
    Local.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
}

#[allow(dead_code)]
impl Harness {
    pub fn new(hw: MockHardware) -> Self {
        Self::with_store(hw, MemoryStore::default())
    }

    pub fn with_store(hw: MockHardware, store: MemoryStore) -> Self {
        Self::build(hw, store, LoopSettings::default())
    }

    pub fn build(hw: MockHardware, store: MemoryStore, settings: LoopSettings) -> Self {
        let clock = SimClock::starting_at(local(2024, 6, 1, 12, 0, 0));
        let inbox = Arc::new(ConfigInbox::new());
        let desired = DesiredStore::boot(Box::new(store.clone()), SetpointDomain::default());
        let agent = Reconciler::new(
            hw,
            MockCloud::default(),
            NoWeather,
            clock.clone(),
            desired,
            Arc::clone(&inbox),
            settings,
        );
        Self {
            agent,
            clock,
            inbox,
            store,
        }
    }

    pub fn booted(hw: MockHardware) -> Self {
        let mut h = Self::new(hw);
        h.agent.boot().unwrap();
        h
    }

    pub fn push(&self, doc: Value) {
        self.inbox.push(doc);
    }

    pub fn states(&self) -> &[ReportedState] {
        &self.agent.cloud().states
    }

    pub fn sent(&self) -> &[IrCode] {
        &self.agent.hw().sent
    }
}
