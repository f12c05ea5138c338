//! Control primitives used by the reconciliation loop.
//!
//! - [`filter`]: rolling window and monitored temperature
//! - [`alert`]: threshold alert with hysteresis
//! - [`actuator`]: idempotent setpoint → IR command controller

pub mod actuator;
pub mod alert;
pub mod filter;
