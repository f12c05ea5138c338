//! Actuator controller: setpoint to IR command mapping.
//!
//! The heat pump has no feedback channel, so the controller is the only
//! record of what the unit was last told.  It issues commands only when
//! the validated setpoint actually changes, and it powers the unit on
//! before any non-off command if the last thing it sent was "off" (or if
//! nothing was sent yet this boot).

use core::fmt;

use log::{debug, info};

use crate::app::ports::IrPort;
use crate::error::ActuatorError;
use crate::setpoint::{AC_OFF, COOL_BASE, LOW_HEAT, SetpointDomain};

// ───────────────────────────────────────────────────────────────
// IR codes
// ───────────────────────────────────────────────────────────────

/// A single IR command understood by the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrCode {
    PowerOff,
    PowerOn,
    LowHeat,
    /// Heating at the given degC.
    Heat(u8),
    /// Cooling at the given degC (setpoint minus [`COOL_BASE`]).
    Cool(u8),
}

impl IrCode {
    /// Code for an already-validated setpoint.
    pub fn for_set_point(set_point: i32) -> Self {
        match set_point {
            AC_OFF => Self::PowerOff,
            LOW_HEAT => Self::LowHeat,
            sp if sp > COOL_BASE => Self::Cool((sp - COOL_BASE) as u8),
            sp => Self::Heat(sp as u8),
        }
    }
}

/// LIRC button name, as configured in the remote definition.
impl fmt::Display for IrCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PowerOff => write!(f, "AC_OFF"),
            Self::PowerOn => write!(f, "AC_ON"),
            Self::LowHeat => write!(f, "LH_HIGH_10"),
            Self::Heat(deg) => write!(f, "HEAT_HIGH_{deg}"),
            Self::Cool(deg) => write!(f, "AC_HIGH_{deg}"),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Controller
// ───────────────────────────────────────────────────────────────

/// What the unit was last commanded to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActuatorState {
    /// Last successfully issued setpoint; `None` until the first command.
    pub last_commanded: Option<i32>,
    /// Whether the unit is believed to be powered.
    pub powered: bool,
    /// Whether the last command selected cooling mode.
    pub cooling: bool,
    /// Last code sent (for the reported state).
    pub last_code: Option<IrCode>,
}

/// Idempotent setpoint → IR command translator.
pub struct ActuatorController {
    domain: SetpointDomain,
    state: ActuatorState,
    commands_sent: u64,
}

impl ActuatorController {
    pub fn new(domain: SetpointDomain) -> Self {
        Self {
            domain,
            state: ActuatorState::default(),
            commands_sent: 0,
        }
    }

    /// Drive the unit toward `requested`.
    ///
    /// Returns `Ok(true)` if commands were issued, `Ok(false)` if the unit
    /// already holds that setpoint.  State only advances once every
    /// command for this change was handed to the transmitter.
    pub fn set_temperature(
        &mut self,
        requested: i32,
        ir: &mut impl IrPort,
    ) -> Result<bool, ActuatorError> {
        let set_point = self.domain.validate(requested);
        if self.state.last_commanded == Some(set_point) {
            debug!("Actuator: already at {}, not re-sent", set_point);
            return Ok(false);
        }

        if set_point != AC_OFF && !self.state.powered {
            info!("Actuator: switching unit back on");
            self.send(IrCode::PowerOn, ir)?;
            self.state.powered = true;
        }

        let code = IrCode::for_set_point(set_point);
        self.send(code, ir)?;

        self.state.last_commanded = Some(set_point);
        self.state.powered = set_point != AC_OFF;
        self.state.cooling = matches!(code, IrCode::Cool(_));
        info!("Actuator: setpoint {} ({})", set_point, code);
        Ok(true)
    }

    fn send(&mut self, code: IrCode, ir: &mut impl IrPort) -> Result<(), ActuatorError> {
        ir.transmit(code)?;
        self.state.last_code = Some(code);
        self.commands_sent += 1;
        Ok(())
    }

    pub fn state(&self) -> ActuatorState {
        self.state
    }

    /// Physical degC the unit is set to, if heating or cooling.
    pub fn commanded_degrees(&self) -> Option<u8> {
        match self.state.last_commanded.map(IrCode::for_set_point) {
            Some(IrCode::Heat(d) | IrCode::Cool(d)) => Some(d),
            _ => None,
        }
    }

    /// Total IR codes handed to the transmitter since boot.
    pub fn commands_sent(&self) -> u64 {
        self.commands_sent
    }
}
