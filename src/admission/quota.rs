use super::RequestKind;
use crate::clock::{self, Clock};
use crate::error::StoreError;
use crate::identity::ClientIdentity;
use crate::store::{self, StateStore};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const SECONDS_PER_DAY: u64 = 86_400;

/// When a quota window rolls over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetPolicy {
    /// Reset when the client's local calendar date changes.
    CalendarDay,
    /// Reset once `period_secs` have elapsed since the window opened.
    FixedWindow { period_secs: u64 },
}

impl ResetPolicy {
    pub fn period_secs(self) -> u64 {
        match self {
            Self::CalendarDay => SECONDS_PER_DAY,
            Self::FixedWindow { period_secs } => period_secs,
        }
    }
}

/// Persisted counter for one (client, kind) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaWindow {
    pub count: u32,
    pub window_start: DateTime<Utc>,
    pub limit: u32,
    pub period_seconds: u64,
    /// Local calendar date the window was opened on.
    #[serde(default)]
    pub reset_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaDecision {
    Allowed { remaining: u32 },
    Denied { reset_at: DateTime<Utc> },
}

/// Read-only view for display badges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotaStatus {
    pub remaining: u32,
    pub limit: u32,
    pub reset_at: DateTime<Utc>,
}

/// Durable per-client request counters.
pub struct QuotaStore {
    store: Arc<dyn StateStore>,
    clock: Arc<dyn Clock>,
    policy: ResetPolicy,
}

impl QuotaStore {
    pub fn new(store: Arc<dyn StateStore>, clock: Arc<dyn Clock>, policy: ResetPolicy) -> Self {
        Self {
            store,
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> ResetPolicy {
        self.policy
    }

    /// Evaluate the limit and, when `consume` is set, count the request.
    ///
    /// The rollover check and the increment happen inside a single atomic
    /// store update so concurrent callers cannot lose increments.
    pub fn check_and_consume(
        &self,
        client: &ClientIdentity,
        kind: RequestKind,
        limit: u32,
        consume: bool,
    ) -> Result<QuotaDecision, StoreError> {
        if !consume {
            let status = self.peek(client, kind, limit)?;
            return Ok(if status.remaining > 0 {
                QuotaDecision::Allowed {
                    remaining: status.remaining,
                }
            } else {
                QuotaDecision::Denied {
                    reset_at: status.reset_at,
                }
            });
        }

        let key = quota_key(client, kind);
        store::update_json::<QuotaWindow, QuotaDecision>(self.store.as_ref(), &key, |current| {
            let mut window = self.current_window(current, limit);
            if window.count >= limit {
                let reset_at = self.reset_at(&window);
                return (Some(window), QuotaDecision::Denied { reset_at });
            }
            window.count += 1;
            let remaining = limit - window.count;
            (Some(window), QuotaDecision::Allowed { remaining })
        })
    }

    /// Current usage without consuming anything. Does not write.
    pub fn peek(
        &self,
        client: &ClientIdentity,
        kind: RequestKind,
        limit: u32,
    ) -> Result<QuotaStatus, StoreError> {
        let stored = store::get_json::<QuotaWindow>(self.store.as_ref(), &quota_key(client, kind))?;
        let window = self.current_window(stored, limit);
        Ok(QuotaStatus {
            remaining: limit.saturating_sub(window.count),
            limit,
            reset_at: self.reset_at(&window),
        })
    }

    /// The stored window, or a fresh one if it is missing or has expired.
    fn current_window(&self, stored: Option<QuotaWindow>, limit: u32) -> QuotaWindow {
        let now = self.clock.now();
        let today = self.clock.local_date();
        match stored {
            Some(mut window) if !self.expired(&window, now, today) => {
                window.limit = limit;
                window
            }
            Some(stale) => {
                tracing::debug!(
                    count = stale.count,
                    since = %stale.window_start,
                    "Quota window rolled over"
                );
                self.fresh_window(now, today, limit)
            }
            None => self.fresh_window(now, today, limit),
        }
    }

    fn fresh_window(&self, now: DateTime<Utc>, today: NaiveDate, limit: u32) -> QuotaWindow {
        QuotaWindow {
            count: 0,
            window_start: now,
            limit,
            period_seconds: self.policy.period_secs(),
            reset_date: Some(today),
        }
    }

    fn expired(&self, window: &QuotaWindow, now: DateTime<Utc>, today: NaiveDate) -> bool {
        match self.policy {
            ResetPolicy::CalendarDay => window.reset_date != Some(today),
            ResetPolicy::FixedWindow { period_secs } => {
                now > clock::add_secs(window.window_start, period_secs)
            }
        }
    }

    fn reset_at(&self, window: &QuotaWindow) -> DateTime<Utc> {
        match self.policy {
            ResetPolicy::CalendarDay => self.clock.next_local_midnight(),
            ResetPolicy::FixedWindow { period_secs } => {
                clock::add_secs(window.window_start, period_secs)
            }
        }
    }
}

fn quota_key(client: &ClientIdentity, kind: RequestKind) -> String {
    format!("quota:{client}:{kind}")
}
