//! Hardware adapter: bridges the thermometer and IR transmitter to the
//! domain port traits.
//!
//! Owns both drivers so the [`Reconciler`](crate::app::service::Reconciler)
//! sees one value implementing [`TemperaturePort`] and [`IrPort`].  Both
//! drivers degrade to simulation on their own when hardware is absent.

use crate::app::ports::{IrPort, TemperaturePort};
use crate::config::AgentConfig;
use crate::control::actuator::IrCode;
use crate::drivers::ir::LircTransmitter;
use crate::error::ActuatorError;
use crate::sensors::temperature::W1Thermometer;

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter {
    thermometer: W1Thermometer,
    ir: LircTransmitter,
}

impl HardwareAdapter {
    pub fn new(thermometer: W1Thermometer, ir: LircTransmitter) -> Self {
        Self { thermometer, ir }
    }

    /// Build both drivers from the agent configuration.
    pub fn from_config(config: &AgentConfig) -> Self {
        Self::new(
            W1Thermometer::discover(&config.sensor, config.simulated),
            LircTransmitter::new(&config.ir, config.simulated),
        )
    }

    pub fn ir(&self) -> &LircTransmitter {
        &self.ir
    }

    pub fn is_simulated(&self) -> bool {
        self.thermometer.is_simulated() && self.ir.is_simulated()
    }
}

// ── TemperaturePort implementation ───────────────────────────

impl TemperaturePort for HardwareAdapter {
    fn read_raw(&mut self) -> f32 {
        self.thermometer.read()
    }
}

// ── IrPort implementation ────────────────────────────────────

impl IrPort for HardwareAdapter {
    fn transmit(&mut self, code: IrCode) -> Result<(), ActuatorError> {
        self.ir.transmit(code)
    }
}
