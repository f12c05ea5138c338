//! Port traits: the hexagonal boundary between the reconciliation core
//! and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Reconciler (domain)
//! ```
//!
//! Driven adapters (thermometer, IR transmitter, cloud transport, weather
//! cache, desired-state file, clock) implement these traits.  The
//! [`Reconciler`](super::service::Reconciler) consumes them via generics,
//! so the core never touches hardware, sockets or the wall clock directly.

use core::time::Duration;

use chrono::{DateTime, Local};
use serde_json::Value;

use super::inbox::ConfigInbox;
use super::reports::{ReportedState, TelemetryRecord, WeatherReading};
use crate::control::actuator::IrCode;
use crate::error::ActuatorError;

// ───────────────────────────────────────────────────────────────
// Sensor port (hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port for the room thermometer.
pub trait TemperaturePort {
    /// Current room temperature in degC.
    ///
    /// Never fails: implementations substitute the last good or a
    /// simulated value when the sensor is absent or unreadable.
    fn read_raw(&mut self) -> f32;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: one IR code to the heat pump.
///
/// Transmission is one-way.  `Ok` only means the code left the device.
/// Implementations must not interleave two codes.
pub trait IrPort {
    fn transmit(&mut self, code: IrCode) -> Result<(), ActuatorError>;
}

// ───────────────────────────────────────────────────────────────
// Cloud port (domain → transport)
// ───────────────────────────────────────────────────────────────

/// Upstream reporting.  Configuration pushes travel the other way through
/// the [`ConfigInbox`].
///
/// Both calls return whether the record was delivered (or at least
/// accepted for delivery while connected).  A `false` is never an error
/// for the loop; it only withholds the "last successful contact" stamp.
pub trait CloudPort {
    fn report_state(&mut self, state: &ReportedState) -> bool;
    fn report_telemetry(&mut self, record: &TelemetryRecord) -> bool;
}

impl<T: CloudPort + ?Sized> CloudPort for Box<T> {
    fn report_state(&mut self, state: &ReportedState) -> bool {
        (**self).report_state(state)
    }

    fn report_telemetry(&mut self, record: &TelemetryRecord) -> bool {
        (**self).report_telemetry(record)
    }
}

// ───────────────────────────────────────────────────────────────
// Weather port (read-only cache)
// ───────────────────────────────────────────────────────────────

/// Latest outdoor conditions, refreshed by the adapter on its own cadence.
pub trait WeatherPort {
    fn latest(&self) -> Option<WeatherReading>;
}

/// Weather source for installations without one.
pub struct NoWeather;

impl WeatherPort for NoWeather {
    fn latest(&self) -> Option<WeatherReading> {
        None
    }
}

// ───────────────────────────────────────────────────────────────
// Configuration port (domain ↔ durable desired state)
// ───────────────────────────────────────────────────────────────

/// Loads and persists the desired-state record.
///
/// The record is an untyped JSON object on purpose: normalisation into a
/// [`DesiredConfig`](crate::desired::DesiredConfig) happens exactly once,
/// in the [`DesiredStore`](crate::desired::DesiredStore).
pub trait ConfigPort {
    /// Read the stored record.  [`ConfigError::NotFound`] on first boot.
    fn load(&self) -> Result<Value, ConfigError>;

    /// Persist the record atomically.  Must not return before the data is
    /// durable.
    fn save(&self, record: &Value) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Why an interruptible sleep returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// The full period elapsed.
    Elapsed,
    /// A configuration push or shutdown request arrived.
    Interrupted,
}

/// Wall clock plus the loop's single cancellation point.
pub trait Clock {
    fn now(&self) -> DateTime<Local>;

    /// Sleep for `period` unless `inbox` has (or receives) something for
    /// the loop first.
    fn sleep(&self, inbox: &ConfigInbox, period: Duration) -> Wake;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No record found in storage (first boot).
    NotFound,
    /// Stored record is not a JSON object.
    Corrupted,
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "desired state not found"),
            Self::Corrupted => write!(f, "desired state corrupted"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
