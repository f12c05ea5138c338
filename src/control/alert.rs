//! Temperature alert with hysteresis.
//!
//! The alert asserts when the monitored temperature leaves `[low, high]`.
//! Once asserted, both bounds move one degree inward, so the temperature
//! has to come back at least one degree inside the band before the alert
//! clears.  Without that margin a reading hovering at a boundary would
//! flap the alert (and the out-of-band state report) every sample.

use serde::{Deserialize, Serialize};

/// Inward shift applied to both bounds while alerting.
const HYSTERESIS_C: f32 = 1.0;

/// Alert band in degC.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    pub low: f32,
    pub high: f32,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            low: 7.0,
            high: 28.0,
        }
    }
}

impl AlertThresholds {
    /// Evaluate the alert for `monitored`, given whether it is currently raised.
    pub fn is_alert(&self, monitored: f32, currently_alerting: bool) -> bool {
        let (low, high) = if currently_alerting {
            (self.low + HYSTERESIS_C, self.high - HYSTERESIS_C)
        } else {
            (self.low, self.high)
        };
        monitored < low || monitored > high
    }
}
