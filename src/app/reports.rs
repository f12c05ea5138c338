//! Outbound records.
//!
//! The [`Reconciler`](super::service::Reconciler) builds these fresh on
//! every emission and hands them to the [`CloudPort`](super::ports::CloudPort).
//! Field names are the cloud document keys, hence the camelCase renames.

use std::net::IpAddr;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// Software identity embedded in every reported state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SoftwareInfo {
    pub version: &'static str,
}

impl SoftwareInfo {
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// Device self-description (the "reported" half of the twin).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportedState {
    pub software: SoftwareInfo,
    pub boot_time: DateTime<Local>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<IpAddr>,
    #[serde(rename = "tempAlert")]
    pub alert: bool,
    pub fallback_armed: bool,
    pub telemetry_interval: u32,
    #[serde(rename = "tempSetPoint")]
    pub set_point: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// `updateTime` of the desired configuration in force.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desired_update_time: Option<DateTime<Local>>,
    /// Last IR code sent to the unit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actuator_code: Option<String>,
    /// When this report was built.
    pub update_time: DateTime<Local>,
}

/// Cached outdoor conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    pub temp: f64,
    pub wind: f64,
    pub fetched_utctime: DateTime<Utc>,
}

/// One telemetry sample sent on the regular cadence.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryRecord {
    #[serde(rename = "tempSetPoint")]
    pub set_point: i32,
    /// Monitored (filtered) temperature.
    pub temp_current: f32,
    /// Instantaneous reading behind it.
    pub temp_raw: f32,
    #[serde(rename = "tempAlert")]
    pub alert: bool,
    #[serde(rename = "utctime")]
    pub captured_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outdoor: Option<WeatherReading>,
}
