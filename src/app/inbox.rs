//! Single-slot hand-off between the transport thread and the loop.
//!
//! The transport pushes raw desired-state documents whenever the cloud
//! sends one; the loop takes at most one per wake-up.  The slot holds
//! only the newest document, so a burst of pushes collapses into the
//! last one (last-write-wins, nothing queued).
//!
//! The same condvar carries the operator shutdown request, which makes
//! [`ConfigInbox::wait_timeout`] the loop's only cancellation point.

use std::time::{Duration, Instant};

use log::debug;
use parking_lot::{Condvar, Mutex};
use serde_json::Value;

#[derive(Default)]
struct Slot {
    pending: Option<Value>,
    shutdown: bool,
}

impl Slot {
    fn interrupting(&self) -> bool {
        self.pending.is_some() || self.shutdown
    }
}

/// Mutex-guarded "latest desired configuration" slot plus shutdown flag.
#[derive(Default)]
pub struct ConfigInbox {
    slot: Mutex<Slot>,
    signal: Condvar,
}

impl ConfigInbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a freshly pushed document.  Replaces any unconsumed one.
    pub fn push(&self, raw: Value) {
        let mut slot = self.slot.lock();
        if slot.pending.replace(raw).is_some() {
            debug!("Inbox: unconsumed desired state superseded");
        }
        self.signal.notify_all();
    }

    /// Take the pending document, if any.
    pub fn take(&self) -> Option<Value> {
        self.slot.lock().pending.take()
    }

    /// Ask the loop to stop at its next cancellation point.
    pub fn request_shutdown(&self) {
        self.slot.lock().shutdown = true;
        self.signal.notify_all();
    }

    pub fn is_shutdown(&self) -> bool {
        self.slot.lock().shutdown
    }

    /// Whether a document or a shutdown request is waiting.
    pub fn has_interrupt(&self) -> bool {
        self.slot.lock().interrupting()
    }

    /// Block for up to `timeout`.  Returns `true` as soon as a document or
    /// shutdown request is present, `false` if the timeout ran out.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut slot = self.slot.lock();
        while !slot.interrupting() {
            if self.signal.wait_until(&mut slot, deadline).timed_out() {
                break;
            }
        }
        slot.interrupting()
    }
}
