//! Actuator drivers.

pub mod ir;
