//! Reconciliation loop: the hexagonal core.
//!
//! [`Reconciler`] owns the desired-state store, temperature filter,
//! actuator controller and fallback scheduler, and drives them on the
//! telemetry cadence.  All I/O flows through port traits held as generic
//! parameters, so the whole loop runs against mocks and a simulated
//! clock in tests.
//!
//! ```text
//!  TemperaturePort ──▶ ┌───────────────────────────┐ ──▶ CloudPort
//!                      │        Reconciler         │
//!           IrPort ◀── │ Filter · Alert · Fallback │ ◀── WeatherPort
//!                      │ Actuator · DesiredStore   │
//!                      └─────────────▲─────────────┘
//!                                    │ take() / sleep()
//!                               ConfigInbox ◀── transport thread
//! ```
//!
//! One cycle: apply a pending push, re-assert the setpoint, sample,
//! re-check the alert, send telemetry, evaluate the fallback, then sleep
//! the telemetry interval in sampling-period steps.  Every step
//! re-samples, so an alert transition or a due fallback ends the sleep
//! early.  The sleep runs even when an earlier step failed.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use log::{debug, error, info, warn};

use crate::control::actuator::ActuatorController;
use crate::control::alert::AlertThresholds;
use crate::control::filter::{FilteredReading, TemperatureFilter};
use crate::desired::{DesiredConfig, DesiredStore};
use crate::error::Result;
use crate::scheduler::{FallbackPolicy, FallbackScheduler, FallbackState};

use super::inbox::ConfigInbox;
use super::ports::{Clock, CloudPort, IrPort, TemperaturePort, Wake, WeatherPort};
use super::reports::{ReportedState, SoftwareInfo, TelemetryRecord};

// ───────────────────────────────────────────────────────────────
// Settings and statistics
// ───────────────────────────────────────────────────────────────

/// Shortest sleep step; keeps the sleep loop finite.
pub const MIN_SAMPLING_PERIOD: Duration = Duration::from_secs(1);

/// Loop parameters fixed for the life of the process.
#[derive(Debug, Clone)]
pub struct LoopSettings {
    /// Sub-interval of the interruptible sleep; one sample per step.
    pub sampling_period: Duration,
    pub thresholds: AlertThresholds,
    pub fallback: FallbackPolicy,
    /// Address reported upstream.
    pub ip_address: Option<IpAddr>,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            sampling_period: Duration::from_secs(10),
            thresholds: AlertThresholds::default(),
            fallback: FallbackPolicy::default(),
            ip_address: None,
        }
    }
}

/// Counters for tests and the shutdown log line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub cycles: u64,
    pub failed_cycles: u64,
    pub fallbacks_fired: u64,
    pub states_reported: u64,
    pub telemetry_sent: u64,
}

// ───────────────────────────────────────────────────────────────
// Reconciler
// ───────────────────────────────────────────────────────────────

/// Drives the unit toward the desired configuration.
///
/// `hw` satisfies both [`TemperaturePort`] and [`IrPort`] so the sensor
/// and transmitter share one owner without a double mutable borrow.
pub struct Reconciler<H, C, W, K>
where
    H: TemperaturePort + IrPort,
    C: CloudPort,
    W: WeatherPort,
    K: Clock,
{
    hw: H,
    cloud: C,
    weather: W,
    clock: K,
    inbox: Arc<ConfigInbox>,

    store: DesiredStore,
    filter: TemperatureFilter,
    actuator: ActuatorController,
    fallback: FallbackScheduler,

    settings: LoopSettings,
    alert: bool,
    last_reading: Option<FilteredReading>,
    boot_time: DateTime<Local>,
    last_contact: Option<DateTime<Local>>,
    stats: LoopStats,
}

impl<H, C, W, K> Reconciler<H, C, W, K>
where
    H: TemperaturePort + IrPort,
    C: CloudPort,
    W: WeatherPort,
    K: Clock,
{
    /// Assemble the loop.  Nothing is sampled or commanded until
    /// [`boot`](Self::boot) (or [`run`](Self::run)).
    pub fn new(
        hw: H,
        cloud: C,
        weather: W,
        clock: K,
        store: DesiredStore,
        inbox: Arc<ConfigInbox>,
        mut settings: LoopSettings,
    ) -> Self {
        settings.sampling_period = settings.sampling_period.max(MIN_SAMPLING_PERIOD);
        let capacity = Self::window_for(store.current(), settings.sampling_period);
        let actuator = ActuatorController::new(*store.domain());
        let fallback = FallbackScheduler::new(settings.fallback);
        let boot_time = clock.now();
        Self {
            hw,
            cloud,
            weather,
            clock,
            inbox,
            store,
            filter: TemperatureFilter::new(capacity),
            actuator,
            fallback,
            settings,
            alert: false,
            last_reading: None,
            boot_time,
            last_contact: None,
            stats: LoopStats::default(),
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Apply the configuration restored at boot and announce ourselves.
    pub fn boot(&mut self) -> Result<()> {
        info!(
            "Reconciler: boot, software {} sampling {:?}",
            SoftwareInfo::current().version,
            self.settings.sampling_period
        );
        let config = self.store.current().clone();
        self.apply_config(&config)
    }

    /// Boot, then cycle until an operator shutdown is requested.
    pub fn run(&mut self) {
        if let Err(e) = self.boot() {
            error!("Reconciler: boot apply failed: {}", e);
        }
        while !self.inbox.is_shutdown() {
            self.run_cycle();
        }
        info!(
            "Reconciler: shutdown after {} cycles ({} failed, {} fallbacks)",
            self.stats.cycles, self.stats.failed_cycles, self.stats.fallbacks_fired
        );
    }

    /// One cycle with failures caught and logged.
    pub fn run_cycle(&mut self) {
        self.stats.cycles += 1;
        if let Err(e) = self.cycle() {
            self.stats.failed_cycles += 1;
            error!("Reconciler: cycle {} failed: {}", self.stats.cycles, e);
        }
    }

    /// Reconcile, then sleep even if reconciling failed.
    fn cycle(&mut self) -> Result<()> {
        let outcome = self.reconcile();
        self.sleep_interruptibly();
        outcome
    }

    fn reconcile(&mut self) -> Result<()> {
        // 1. Configuration pushed since the last cycle
        self.apply_pending()?;

        // 2. Re-assert the setpoint in force; no-op unless a send failed
        self.actuator
            .set_temperature(self.store.current().set_point, &mut self.hw)?;

        // 3. Sample and re-check the alert
        let reading = self.sample();
        self.update_alert(reading.monitored);

        // 4. Telemetry
        self.send_telemetry(reading);

        // 5. Dead-man fallback
        self.evaluate_fallback()
    }

    // ── Steps ─────────────────────────────────────────────────

    fn apply_pending(&mut self) -> Result<()> {
        let Some(raw) = self.inbox.take() else {
            return Ok(());
        };
        let adopted = match self.store.adopt(&raw) {
            Ok(Some(config)) => config.clone(),
            Ok(None) => return Ok(()),
            Err(e) => {
                warn!("Reconciler: pushed configuration not persisted, keeping previous: {}", e);
                return Ok(());
            }
        };
        self.apply_config(&adopted)
    }

    /// Resize the window, re-arm the fallback, command the unit, report.
    fn apply_config(&mut self, config: &DesiredConfig) -> Result<()> {
        let capacity = Self::window_for(config, self.settings.sampling_period);
        if capacity != self.filter.capacity() {
            debug!("Reconciler: window {} -> {}", self.filter.capacity(), capacity);
            self.filter.resize(capacity);
        }
        self.fallback.arm(config);
        let commanded = self.actuator.set_temperature(config.set_point, &mut self.hw);
        self.report_state();
        commanded?;
        Ok(())
    }

    fn sample(&mut self) -> FilteredReading {
        let raw = self.hw.read_raw();
        let reading = self.filter.ingest(raw);
        debug!("Reconciler: raw {} monitored {}", reading.raw, reading.monitored);
        self.last_reading = Some(reading);
        reading
    }

    /// Returns whether the alert flipped (and was reported).
    fn update_alert(&mut self, monitored: f32) -> bool {
        let alert = self.settings.thresholds.is_alert(monitored, self.alert);
        if alert == self.alert {
            return false;
        }
        if alert {
            warn!("Reconciler: temperature alert raised at {}", monitored);
        } else {
            info!("Reconciler: temperature alert cleared at {}", monitored);
        }
        self.alert = alert;
        self.report_state();
        true
    }

    fn send_telemetry(&mut self, reading: FilteredReading) {
        let record = TelemetryRecord {
            set_point: self.store.current().set_point,
            temp_current: reading.monitored,
            temp_raw: reading.raw,
            alert: self.alert,
            captured_at: self.clock.now().with_timezone(&Utc),
            outdoor: self.weather.latest(),
        };
        if self.cloud.report_telemetry(&record) {
            self.stats.telemetry_sent += 1;
            self.last_contact = Some(self.clock.now());
        } else {
            debug!("Reconciler: telemetry not delivered");
        }
    }

    fn evaluate_fallback(&mut self) -> Result<()> {
        let Some(fired) = self.fallback.tick(self.clock.now(), self.last_contact) else {
            return Ok(());
        };
        let set_point = self.store.apply_fallback(fired.set_point);
        self.fallback.consume();
        self.stats.fallbacks_fired += 1;
        warn!("Reconciler: fallback engaged, setpoint now {}", set_point);

        let commanded = self.actuator.set_temperature(set_point, &mut self.hw);
        self.report_state();
        commanded?;
        Ok(())
    }

    /// Sleep the telemetry interval in sampling-period steps.
    ///
    /// Returns early on a push or shutdown, an alert transition (reported
    /// here, before returning) or a due fallback.
    fn sleep_interruptibly(&mut self) {
        let interval = Duration::from_secs(u64::from(self.store.current().telemetry_interval_secs));
        let mut remaining = interval;
        while !remaining.is_zero() {
            let step = remaining.min(self.settings.sampling_period);
            if self.clock.sleep(&self.inbox, step) == Wake::Interrupted {
                debug!("Reconciler: sleep interrupted");
                return;
            }
            remaining = remaining.saturating_sub(step);

            let reading = self.sample();
            if self.update_alert(reading.monitored) {
                return;
            }
            if self.fallback.is_due(self.clock.now(), self.last_contact) {
                debug!("Reconciler: fallback due, ending sleep");
                return;
            }
        }
    }

    fn report_state(&mut self) {
        let state = self.build_reported();
        if self.cloud.report_state(&state) {
            self.stats.states_reported += 1;
            self.last_contact = Some(state.update_time);
        } else {
            warn!("Reconciler: reported state not delivered");
        }
    }

    fn build_reported(&self) -> ReportedState {
        let config = self.store.current();
        ReportedState {
            software: SoftwareInfo::current(),
            boot_time: self.boot_time,
            ip_address: self.settings.ip_address,
            alert: self.alert,
            fallback_armed: self.fallback.is_armed(),
            telemetry_interval: config.telemetry_interval_secs,
            set_point: config.set_point,
            location: config.location.clone(),
            desired_update_time: config.update_time,
            actuator_code: self.actuator.state().last_code.map(|c| c.to_string()),
            update_time: self.clock.now(),
        }
    }

    fn window_for(config: &DesiredConfig, sampling: Duration) -> usize {
        let sampling_secs = u32::try_from(sampling.as_secs()).unwrap_or(u32::MAX);
        TemperatureFilter::capacity_for(config.telemetry_interval_secs, sampling_secs)
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn desired(&self) -> &DesiredConfig {
        self.store.current()
    }

    pub fn actuator(&self) -> &ActuatorController {
        &self.actuator
    }

    pub fn fallback_state(&self) -> FallbackState {
        self.fallback.state()
    }

    pub fn is_alerting(&self) -> bool {
        self.alert
    }

    pub fn last_reading(&self) -> Option<FilteredReading> {
        self.last_reading
    }

    pub fn window_len(&self) -> usize {
        self.filter.len()
    }

    pub fn window_capacity(&self) -> usize {
        self.filter.capacity()
    }

    pub fn last_contact(&self) -> Option<DateTime<Local>> {
        self.last_contact
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn hw(&self) -> &H {
        &self.hw
    }

    pub fn hw_mut(&mut self) -> &mut H {
        &mut self.hw
    }

    pub fn cloud(&self) -> &C {
        &self.cloud
    }

    pub fn cloud_mut(&mut self) -> &mut C {
        &mut self.cloud
    }

    pub fn inbox(&self) -> &Arc<ConfigInbox> {
        &self.inbox
    }
}
