//! Sensor drivers.
//!
//! Only the room thermometer for now; outdoor conditions come from the
//! weather adapter, not a local sensor.

pub mod temperature;
