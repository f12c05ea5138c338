//! Clock adapters.
//!
//! - [`SystemClock`]: wall clock; sleeps by waiting on the
//!   [`ConfigInbox`] condvar with a deadline, so a push or shutdown
//!   wakes it immediately.
//! - [`SimClock`]: manually driven time for tests and dry runs.  A sleep
//!   advances simulated time by the full period and never blocks.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, TimeDelta};
use parking_lot::Mutex;

use crate::app::inbox::ConfigInbox;
use crate::app::ports::{Clock, Wake};

/// Real time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }

    fn sleep(&self, inbox: &ConfigInbox, period: Duration) -> Wake {
        if inbox.wait_timeout(period) {
            Wake::Interrupted
        } else {
            Wake::Elapsed
        }
    }
}

/// Simulated time.  Clones share the same instant.
#[derive(Debug, Clone)]
pub struct SimClock {
    now: Arc<Mutex<DateTime<Local>>>,
}

impl SimClock {
    pub fn starting_at(at: DateTime<Local>) -> Self {
        Self {
            now: Arc::new(Mutex::new(at)),
        }
    }

    pub fn set(&self, at: DateTime<Local>) {
        *self.now.lock() = at;
    }

    pub fn advance(&self, by: Duration) {
        let delta = TimeDelta::from_std(by).unwrap_or(TimeDelta::MAX);
        let mut now = self.now.lock();
        *now = now.checked_add_signed(delta).unwrap_or(*now);
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::starting_at(Local::now())
    }
}

impl Clock for SimClock {
    fn now(&self) -> DateTime<Local> {
        *self.now.lock()
    }

    fn sleep(&self, inbox: &ConfigInbox, period: Duration) -> Wake {
        if inbox.has_interrupt() {
            return Wake::Interrupted;
        }
        self.advance(period);
        Wake::Elapsed
    }
}
