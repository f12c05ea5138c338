//! Desired configuration and its store.
//!
//! The cloud document is loosely typed: keys may be missing, numbers may
//! arrive as strings, dates may be garbage.  [`DesiredConfig::merge`] is
//! the one place that turns such a document into a fully valid, typed
//! configuration by filling every absent or invalid field from the
//! defaults.  Nothing downstream ever sees an unvalidated value.
//!
//! [`DesiredStore`] owns the configuration in force.  A new document is
//! merged, persisted through the [`ConfigPort`], and only then adopted.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};
use log::{info, warn};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::app::ports::{ConfigError, ConfigPort};
use crate::setpoint::{LOW_HEAT, SetpointDomain};

// --- Document keys ---
pub const KEY_TELEMETRY_INTERVAL: &str = "telemetryInterval";
pub const KEY_SET_POINT: &str = "tempSetPoint";
pub const KEY_FALLBACK_DATE: &str = "fallbackDate";
pub const KEY_FALLBACK_SET_POINT: &str = "fallbackSetPoint";
pub const KEY_UPDATE_TIME: &str = "updateTime";
pub const KEY_LOCATION: &str = "location";
/// Device-side marker: the fallback of this revision already fired.
pub const KEY_FALLBACK_FIRED: &str = "fallbackFired";

// --- Defaults and bounds ---
pub const DEFAULT_TELEMETRY_INTERVAL_SECS: u32 = 20 * 60;
pub const MIN_TELEMETRY_INTERVAL_SECS: u32 = 30;
pub const MAX_TELEMETRY_INTERVAL_SECS: u32 = 3600;
pub const DEFAULT_SET_POINT: i32 = 21;
pub const DEFAULT_FALLBACK_SET_POINT: i32 = LOW_HEAT;

/// Validated desired configuration.
///
/// Serialises back into the same document shape it was merged from, which
/// is also the persisted record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DesiredConfig {
    #[serde(rename = "telemetryInterval")]
    pub telemetry_interval_secs: u32,
    #[serde(rename = "tempSetPoint")]
    pub set_point: i32,
    /// Raw `YYYY-MM-DD`; parsed (and possibly rejected) by the fallback
    /// scheduler.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_date: Option<String>,
    pub fallback_set_point: i32,
    /// Set once the fallback of this revision has been applied, so a
    /// reboot does not fire it again.  Cleared by any newly adopted
    /// document.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub fallback_fired: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_time: Option<DateTime<Local>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl Default for DesiredConfig {
    fn default() -> Self {
        Self {
            telemetry_interval_secs: DEFAULT_TELEMETRY_INTERVAL_SECS,
            set_point: DEFAULT_SET_POINT,
            fallback_date: None,
            fallback_set_point: DEFAULT_FALLBACK_SET_POINT,
            fallback_fired: false,
            update_time: None,
            location: None,
        }
    }
}

impl DesiredConfig {
    /// Merge a raw document over the defaults.
    ///
    /// Pure.  Absent or malformed fields take their default; numeric
    /// fields are clamped or domain-validated.  A non-object document
    /// yields the defaults.
    pub fn merge(raw: &Value, domain: &SetpointDomain) -> Self {
        let defaults = Self::default();
        let empty = Map::new();
        let doc = raw.as_object().unwrap_or(&empty);

        let telemetry_interval_secs = doc
            .get(KEY_TELEMETRY_INTERVAL)
            .and_then(as_integer)
            .map_or(defaults.telemetry_interval_secs, |secs| {
                secs.clamp(
                    i64::from(MIN_TELEMETRY_INTERVAL_SECS),
                    i64::from(MAX_TELEMETRY_INTERVAL_SECS),
                ) as u32
            });

        let set_point = doc
            .get(KEY_SET_POINT)
            .and_then(as_integer)
            .map_or(defaults.set_point, |sp| domain.validate(saturate_i32(sp)));

        let fallback_set_point = doc
            .get(KEY_FALLBACK_SET_POINT)
            .and_then(as_integer)
            .map_or(defaults.fallback_set_point, |sp| {
                domain.validate(saturate_i32(sp))
            });

        let fallback_date = doc
            .get(KEY_FALLBACK_DATE)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned);

        let fallback_fired = doc
            .get(KEY_FALLBACK_FIRED)
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let update_time = doc
            .get(KEY_UPDATE_TIME)
            .and_then(Value::as_str)
            .and_then(|s| {
                let parsed = parse_timestamp(s);
                if parsed.is_none() {
                    warn!("Desired: unparseable {} '{}', ignored", KEY_UPDATE_TIME, s);
                }
                parsed
            });

        let location = doc
            .get(KEY_LOCATION)
            .and_then(Value::as_str)
            .map(str::to_owned);

        Self {
            telemetry_interval_secs,
            set_point,
            fallback_date,
            fallback_set_point,
            fallback_fired,
            update_time,
            location,
        }
    }

    /// Same upstream revision (both stamped, same `updateTime`).
    pub fn same_revision(&self, other: &Self) -> bool {
        self.update_time.is_some() && self.update_time == other.update_time
    }

    /// The persisted / reported document form.
    pub fn to_document(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Integer from a JSON number or numeric string.  Floats are rounded.
fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite())
                .map(|f| f.round().clamp(i64::MIN as f64, i64::MAX as f64) as i64)
        }),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.round().clamp(i64::MIN as f64, i64::MAX as f64) as i64)
            })
        }
        _ => None,
    }
}

fn saturate_i32(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Parse an upstream timestamp.
///
/// Accepts RFC 3339, a zone-less ISO datetime (taken as local time), or a
/// bare date (local midnight).
pub fn parse_timestamp(s: &str) -> Option<DateTime<Local>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Local));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Local.from_local_datetime(&naive).earliest();
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    local_midnight(date)
}

/// Start of `date` in local time.  Takes the earlier instant when midnight
/// is ambiguous and `None` when it does not exist.
pub fn local_midnight(date: NaiveDate) -> Option<DateTime<Local>> {
    Local.from_local_datetime(&date.and_hms_opt(0, 0, 0)?).earliest()
}

// ═══════════════════════════════════════════════════════════════
//  Store
// ═══════════════════════════════════════════════════════════════

/// Owner of the desired configuration in force.
pub struct DesiredStore {
    current: DesiredConfig,
    domain: SetpointDomain,
    storage: Box<dyn ConfigPort + Send>,
}

impl DesiredStore {
    /// Load the persisted configuration, or fall back to defaults.
    pub fn boot(storage: Box<dyn ConfigPort + Send>, domain: SetpointDomain) -> Self {
        let current = match storage.load() {
            Ok(raw) => {
                info!("Desired: restored persisted state");
                DesiredConfig::merge(&raw, &domain)
            }
            Err(ConfigError::NotFound) => {
                info!("Desired: no persisted state, using defaults");
                DesiredConfig::default()
            }
            Err(e) => {
                warn!("Desired: persisted state unreadable ({}), using defaults", e);
                DesiredConfig::default()
            }
        };
        Self {
            current,
            domain,
            storage,
        }
    }

    pub fn current(&self) -> &DesiredConfig {
        &self.current
    }

    pub fn domain(&self) -> &SetpointDomain {
        &self.domain
    }

    /// Merge, persist and adopt a pushed document.
    ///
    /// Returns `Ok(None)` when the document carries the revision already in
    /// force.  On a persistence error the previous configuration stays.
    pub fn adopt(&mut self, raw: &Value) -> Result<Option<&DesiredConfig>, ConfigError> {
        let next = DesiredConfig::merge(raw, &self.domain);
        if next.same_revision(&self.current) {
            info!("Desired: revision already in force, ignored");
            return Ok(None);
        }
        self.storage.save(&next.to_document())?;
        info!(
            "Desired: adopted interval={}s setpoint={} fallback={:?}->{}",
            next.telemetry_interval_secs, next.set_point, next.fallback_date, next.fallback_set_point
        );
        self.current = next;
        Ok(Some(&self.current))
    }

    /// Replace the setpoint in force with the fallback setpoint and mark
    /// the revision's fallback as fired.
    ///
    /// Applied in memory even if persisting fails; the failure is logged.
    pub fn apply_fallback(&mut self, set_point: i32) -> i32 {
        let set_point = self.domain.validate(set_point);
        self.current.set_point = set_point;
        self.current.fallback_fired = true;
        if let Err(e) = self.storage.save(&self.current.to_document()) {
            warn!("Desired: fallback override not persisted: {}", e);
        }
        set_point
    }
}
