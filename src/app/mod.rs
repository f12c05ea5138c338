//! Application core: reconciliation logic, zero direct I/O.
//!
//! The [`service::Reconciler`] ties the domain pieces (filter, alert,
//! actuator, fallback, desired store) to the outside world.  All
//! interaction with hardware, the cloud and the clock happens through
//! **port traits** defined in [`ports`], keeping this layer fully
//! testable without real peripherals.

pub mod inbox;
pub mod ports;
pub mod reports;
pub mod service;
