//! Operator shutdown via SIGINT / SIGTERM.
//!
//! The handler only flips a static atomic (async-signal-safe).  A small
//! watcher thread turns that flag into
//! [`ConfigInbox::request_shutdown`], which wakes the loop out of its
//! sleep.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use anyhow::Context;
use log::info;
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};

use crate::app::inbox::ConfigInbox;

static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

/// How often the watcher checks the flag.
const WATCH_PERIOD: Duration = Duration::from_millis(100);

extern "C" fn on_signal(_signum: nix::libc::c_int) {
    SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
}

/// Install the handlers and start forwarding to `inbox`.
pub fn install(inbox: Arc<ConfigInbox>) -> anyhow::Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(on_signal),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    for sig in [Signal::SIGINT, Signal::SIGTERM] {
        // SAFETY: the handler only stores to a static atomic.
        unsafe { sigaction(sig, &action) }.with_context(|| format!("installing {sig} handler"))?;
    }

    thread::Builder::new()
        .name("signals".into())
        .spawn(move || {
            while !SHUTDOWN_REQUESTED.load(Ordering::SeqCst) {
                if inbox.is_shutdown() {
                    return;
                }
                thread::sleep(WATCH_PERIOD);
            }
            info!("Signal: shutdown requested");
            inbox.request_shutdown();
        })
        .context("spawning signal watcher")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raised_signal_requests_shutdown() {
        let inbox = Arc::new(ConfigInbox::new());
        install(Arc::clone(&inbox)).unwrap();
        nix::sys::signal::raise(Signal::SIGTERM).unwrap();
        assert!(inbox.wait_timeout(Duration::from_secs(10)));
        assert!(inbox.is_shutdown());
    }
}
