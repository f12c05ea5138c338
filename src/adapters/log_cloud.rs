//! Log-only cloud adapter.
//!
//! Implements [`CloudPort`] by writing every record to the log.  Used when
//! no MQTT broker is configured; everything counts as delivered, so the
//! last-contact stamp keeps moving and a stale-contact fallback never
//! fires on its account.

use log::info;

use crate::app::ports::CloudPort;
use crate::app::reports::{ReportedState, TelemetryRecord};

/// Adapter that logs every outgoing record to the console.
#[derive(Debug, Default)]
pub struct LogCloud {
    states: u64,
    telemetry: u64,
}

impl LogCloud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn states_logged(&self) -> u64 {
        self.states
    }

    pub fn telemetry_logged(&self) -> u64 {
        self.telemetry
    }
}

impl CloudPort for LogCloud {
    fn report_state(&mut self, s: &ReportedState) -> bool {
        self.states += 1;
        info!(
            "STATE | setpoint={} interval={}s alert={} fallback_armed={} ir={} | {}",
            s.set_point,
            s.telemetry_interval,
            s.alert,
            s.fallback_armed,
            s.actuator_code.as_deref().unwrap_or("-"),
            serde_json::to_string(s).unwrap_or_default(),
        );
        true
    }

    fn report_telemetry(&mut self, t: &TelemetryRecord) -> bool {
        self.telemetry += 1;
        match &t.outdoor {
            Some(w) => info!(
                "TELEM | T={:.1}\u{00b0}C (raw {:.1}) | setpoint={} | alert={} | outdoor={:.1}\u{00b0}C wind={:.1}m/s",
                t.temp_current, t.temp_raw, t.set_point, t.alert, w.temp, w.wind
            ),
            None => info!(
                "TELEM | T={:.1}\u{00b0}C (raw {:.1}) | setpoint={} | alert={}",
                t.temp_current, t.temp_raw, t.set_point, t.alert
            ),
        }
        true
    }
}
