//! Setpoint domain of the IR-controlled heat pump.
//!
//! Setpoints are plain integers so they can travel through the cloud
//! document unchanged.  The legal values form a set of disjoint bands:
//!
//! ```text
//!   0          off
//!   10         low-heat (frost guard)
//!   16 ..= 30  heating, degrees C
//!   121 ..= 125  cooling, degrees C + COOL_BASE
//! ```
//!
//! The cooling band sits above [`COOL_BASE`] so it never collides with a
//! heating degree.  [`SetpointDomain::validate`] maps *any* integer onto
//! one of these bands; nothing is ever rejected.

use serde::{Deserialize, Serialize};

/// Unit switched off.
pub const AC_OFF: i32 = 0;
/// Power-on pseudo setpoint.  Only ever sent as an IR code, never legal
/// as a target.
pub const AC_ON: i32 = 1;
/// Low-heat / frost guard mode.
pub const LOW_HEAT: i32 = 10;
/// Lowest heating setpoint.
pub const HEAT_MIN: i32 = 16;
/// Highest heating setpoint.
pub const HEAT_MAX: i32 = 30;
/// Offset separating cooling setpoints from heating ones.
pub const COOL_BASE: i32 = 100;
/// Lowest cooling setpoint (21 degC).
pub const COOL_MIN: i32 = 121;
/// Highest cooling setpoint (25 degC).
pub const COOL_MAX: i32 = 125;

/// The set of setpoints the installed unit accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetpointDomain {
    /// Whether the unit has a cooling mode.  Without it, everything above
    /// the heating band clamps to [`HEAT_MAX`].
    pub supports_cooling: bool,
}

impl Default for SetpointDomain {
    fn default() -> Self {
        Self {
            supports_cooling: true,
        }
    }
}

impl SetpointDomain {
    /// Map `proposed` onto the nearest legal setpoint.
    ///
    /// Pure and total: `validate(validate(v)) == validate(v)` for all `v`.
    pub fn validate(&self, proposed: i32) -> i32 {
        if proposed == AC_OFF || proposed == LOW_HEAT {
            return proposed;
        }
        if proposed < COOL_BASE || !self.supports_cooling {
            proposed.clamp(HEAT_MIN, HEAT_MAX)
        } else {
            proposed.clamp(COOL_MIN, COOL_MAX)
        }
    }

    /// Whether `value` is already a legal setpoint.
    pub fn is_legal(&self, value: i32) -> bool {
        value == AC_OFF
            || value == LOW_HEAT
            || (HEAT_MIN..=HEAT_MAX).contains(&value)
            || (self.supports_cooling && (COOL_MIN..=COOL_MAX).contains(&value))
    }
}

/// Validate against the full (heating + cooling) domain.
pub fn validate(proposed: i32) -> i32 {
    SetpointDomain::default().validate(proposed)
}
