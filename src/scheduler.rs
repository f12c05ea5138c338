//! Fallback (dead-man) scheduler.
//!
//! Forces a safe setpoint once a configured calendar date has passed
//! without the cloud having replaced the configuration.  The scheduler
//! only decides; the [`Reconciler`](crate::app::service::Reconciler)
//! applies the override and then calls [`FallbackScheduler::consume`].
//!
//! ```text
//!                 arm(cfg) with date >= updateTime
//!   ┌──────────┐ ─────────────────────────────────▶ ┌─────────┐
//!   │ Unarmed  │                                    │  Armed  │
//!   └──────────┘ ◀──── arm(cfg) invalid / stale ─── └────┬────┘
//!        ▲                                               │ tick(now >= at)
//!        │               consume()                  ┌────▼──────┐
//!        └───────────────────────────────────────── │ Triggered │
//!                                                   └───────────┘
//! ```
//!
//! Firing is date-based.  With [`FallbackPolicy::require_stale_contact`]
//! a due fallback additionally waits until no report has been delivered
//! for [`FallbackPolicy::stale_after`].

use chrono::{DateTime, Local, NaiveDate, TimeDelta};
use log::{info, warn};
use serde::Deserialize;

use crate::desired::{DesiredConfig, local_midnight};

/// Date format of `fallbackDate`.
pub const FALLBACK_DATE_FORMAT: &str = "%Y-%m-%d";

// ═══════════════════════════════════════════════════════════════
//  Policy
// ═══════════════════════════════════════════════════════════════

/// When a due fallback may actually fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FallbackPolicy {
    /// Also require that cloud contact has lapsed.
    pub require_stale_contact: bool,
    /// Minutes without a delivered report after which contact is stale.
    pub stale_contact_minutes: u32,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            require_stale_contact: false,
            stale_contact_minutes: 60,
        }
    }
}

impl FallbackPolicy {
    pub fn stale_after(&self) -> TimeDelta {
        TimeDelta::minutes(i64::from(self.stale_contact_minutes))
    }

    /// Whether contact counts as lapsed.  Never having delivered anything
    /// counts as lapsed.
    fn contact_lapsed(&self, now: DateTime<Local>, last_contact: Option<DateTime<Local>>) -> bool {
        if !self.require_stale_contact {
            return true;
        }
        last_contact.is_none_or(|at| now - at >= self.stale_after())
    }
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackState {
    /// No valid, current fallback date.
    Unarmed,
    /// Waiting for `at` (local midnight of the fallback date).
    Armed { at: DateTime<Local>, set_point: i32 },
    /// Fired; waiting for the loop to apply and consume it.
    Triggered { set_point: i32 },
}

/// Emitted by [`FallbackScheduler::tick`] on the single firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackFired {
    pub set_point: i32,
}

pub struct FallbackScheduler {
    state: FallbackState,
    policy: FallbackPolicy,
}

impl FallbackScheduler {
    pub fn new(policy: FallbackPolicy) -> Self {
        Self {
            state: FallbackState::Unarmed,
            policy,
        }
    }

    /// Re-arm from a newly adopted configuration.  Clears any previous
    /// `Triggered` mark.
    pub fn arm(&mut self, config: &DesiredConfig) {
        self.state = match Self::target(config) {
            Some(at) => {
                info!("Fallback: armed for {} -> {}", at, config.fallback_set_point);
                FallbackState::Armed {
                    at,
                    set_point: config.fallback_set_point,
                }
            }
            None => FallbackState::Unarmed,
        };
    }

    /// Target instant for `config`.  `None` if there is no date, if it
    /// already fired for this revision, or if it is unparseable or older
    /// than the configuration itself.
    fn target(config: &DesiredConfig) -> Option<DateTime<Local>> {
        let raw = config.fallback_date.as_deref()?;
        if config.fallback_fired {
            info!("Fallback: {} already applied for this revision, unarmed", raw);
            return None;
        }
        let Ok(date) = NaiveDate::parse_from_str(raw, FALLBACK_DATE_FORMAT) else {
            warn!("Fallback: unparseable date '{}', unarmed", raw);
            return None;
        };
        let Some(at) = local_midnight(date) else {
            warn!("Fallback: no local midnight on {}, unarmed", date);
            return None;
        };
        if config.update_time.is_some_and(|authored| at < authored) {
            info!("Fallback: date {} predates configuration, unarmed", raw);
            return None;
        }
        Some(at)
    }

    /// Evaluate at `now`.  Returns the override exactly once per arming.
    pub fn tick(
        &mut self,
        now: DateTime<Local>,
        last_contact: Option<DateTime<Local>>,
    ) -> Option<FallbackFired> {
        let FallbackState::Armed { at, set_point } = self.state else {
            return None;
        };
        if now < at || !self.policy.contact_lapsed(now, last_contact) {
            return None;
        }
        info!("Fallback: fired at {} (due {}), setpoint {}", now, at, set_point);
        self.state = FallbackState::Triggered { set_point };
        Some(FallbackFired { set_point })
    }

    /// Whether [`tick`](Self::tick) would fire at `now`.  Side-effect free.
    pub fn is_due(&self, now: DateTime<Local>, last_contact: Option<DateTime<Local>>) -> bool {
        match self.state {
            FallbackState::Armed { at, .. } => {
                now >= at && self.policy.contact_lapsed(now, last_contact)
            }
            _ => false,
        }
    }

    /// Mark a fired fallback as applied.
    pub fn consume(&mut self) {
        if matches!(self.state, FallbackState::Triggered { .. }) {
            self.state = FallbackState::Unarmed;
        }
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.state, FallbackState::Armed { .. })
    }

    pub fn state(&self) -> FallbackState {
        self.state
    }

    pub fn policy(&self) -> &FallbackPolicy {
        &self.policy
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
