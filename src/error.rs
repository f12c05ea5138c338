//! Unified error types for the agent.
//!
//! A single `Error` enum that every subsystem converts into, so the
//! reconciliation loop can catch, log and carry on with one match.
//! Validation problems never show up here: bad configuration values are
//! normalised at the store boundary instead.

use core::fmt;

use crate::app::ports::ConfigError;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation inside a reconciliation cycle funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Desired state could not be loaded or persisted.
    Config(ConfigError),
    /// An IR command could not be handed to the transmitter.
    Actuator(ActuatorError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

/// IR transmission is one-way, so the only failures we can observe are
/// local ones: the transmitter program could not be started or refused
/// the code.  Whether the unit actually received it is unknowable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// `irsend` (or the configured replacement) could not be spawned.
    TransmitterUnavailable,
    /// The transmitter ran but exited with a failure status.
    TransmitFailed,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TransmitterUnavailable => write!(f, "IR transmitter unavailable"),
            Self::TransmitFailed => write!(f, "IR transmit failed"),
        }
    }
}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
