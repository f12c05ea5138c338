//! Climate-control reconciliation agent library.
//!
//! Exposes the reconciliation core and its adapters for the binary and
//! for integration testing.  Everything hardware- or network-facing sits
//! behind the port traits in [`app::ports`].

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod control;
pub mod desired;
pub mod error;
pub mod scheduler;
pub mod setpoint;

pub mod adapters;
pub mod drivers;
pub mod sensors;
