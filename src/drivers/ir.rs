//! LIRC infrared transmitter.
//!
//! Each code is sent with `irsend SEND_ONCE <remote> <code>`, repeated a
//! configured number of times with a pause after each send.  The link is
//! one-way, so repeating is the only way to raise the odds the unit saw
//! it.  Calls are synchronous, which keeps codes for the unit strictly
//! ordered.
//!
//! In simulated mode nothing is executed; codes are only recorded in a
//! short history.

use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

use heapless::HistoryBuffer;
use log::{debug, info, warn};

use crate::config::IrConfig;
use crate::control::actuator::IrCode;
use crate::error::ActuatorError;

/// Codes kept for inspection.
const HISTORY_LEN: usize = 32;

pub struct LircTransmitter {
    irsend: PathBuf,
    remote: String,
    repeats: u8,
    repeat_delay: Duration,
    simulated: bool,
    history: HistoryBuffer<IrCode, HISTORY_LEN>,
}

impl LircTransmitter {
    pub fn new(config: &IrConfig, simulated: bool) -> Self {
        if simulated {
            info!("IR: simulated, codes will not be transmitted");
        }
        Self {
            irsend: config.irsend_path.clone(),
            remote: config.remote.clone(),
            repeats: config.repeats.max(1),
            repeat_delay: Duration::from_millis(config.repeat_delay_ms),
            simulated,
            history: HistoryBuffer::new(),
        }
    }

    pub fn transmit(&mut self, code: IrCode) -> Result<(), ActuatorError> {
        if self.simulated {
            debug!("IR: [sim] {} {}", self.remote, code);
        } else {
            let name = code.to_string();
            for _ in 0..self.repeats {
                self.send_once(&name)?;
                thread::sleep(self.repeat_delay);
            }
        }
        self.history.write(code);
        Ok(())
    }

    fn send_once(&self, name: &str) -> Result<(), ActuatorError> {
        let status = Command::new(&self.irsend)
            .args(["SEND_ONCE", self.remote.as_str(), name])
            .stdout(Stdio::null())
            .status()
            .map_err(|e| {
                warn!("IR: cannot run {}: {}", self.irsend.display(), e);
                ActuatorError::TransmitterUnavailable
            })?;
        if !status.success() {
            warn!("IR: irsend {} {} exited with {}", self.remote, name, status);
            return Err(ActuatorError::TransmitFailed);
        }
        Ok(())
    }

    /// Codes sent (or recorded), oldest first.
    pub fn history(&self) -> impl Iterator<Item = IrCode> + '_ {
        self.history.oldest_ordered().copied()
    }

    pub fn last_sent(&self) -> Option<IrCode> {
        self.history.recent().copied()
    }

    pub fn is_simulated(&self) -> bool {
        self.simulated
    }
}
