use super::RequestKind;
use crate::clock::{self, Clock};
use crate::error::StoreError;
use crate::store::{self, StateStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Snapshot of one kind's cooldown, recomputed from the persisted end time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CooldownState {
    pub active: bool,
    pub seconds_remaining: u64,
    pub end_timestamp: Option<DateTime<Utc>>,
}

impl CooldownState {
    const CLEAR: Self = Self {
        active: false,
        seconds_remaining: 0,
        end_timestamp: None,
    };
}

#[derive(Debug, Serialize, Deserialize)]
struct CooldownRecord {
    end: DateTime<Utc>,
}

/// Per-kind cooldown windows that survive a restart.
///
/// Only the end timestamp is stored; the remaining time is always
/// `max(0, end - now)` rounded up to whole seconds.
pub struct CooldownStore {
    store: Arc<dyn StateStore>,
    clock: Arc<dyn Clock>,
}

impl CooldownStore {
    pub fn new(store: Arc<dyn StateStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn state(&self, kind: RequestKind) -> Result<CooldownState, StoreError> {
        let record = store::get_json::<CooldownRecord>(self.store.as_ref(), &cooldown_key(kind))?;
        Ok(record.map_or(CooldownState::CLEAR, |record| self.evaluate(record.end)))
    }

    /// Seconds left, or `None` once the cooldown has lapsed.
    pub fn remaining(&self, kind: RequestKind) -> Result<Option<u64>, StoreError> {
        let state = self.state(kind)?;
        Ok(state.active.then_some(state.seconds_remaining))
    }

    /// Start a cooldown of `secs`, keeping any later end that is already set.
    pub fn start(&self, kind: RequestKind, secs: u64) -> Result<CooldownState, StoreError> {
        let proposed = clock::add_secs(self.clock.now(), secs);
        let end = store::update_json::<CooldownRecord, DateTime<Utc>>(
            self.store.as_ref(),
            &cooldown_key(kind),
            |current| {
                let end = current.map_or(proposed, |record| record.end.max(proposed));
                (Some(CooldownRecord { end }), end)
            },
        )?;
        Ok(self.evaluate(end))
    }

    /// Replace any existing cooldown with one of exactly `secs`.
    pub fn restart(&self, kind: RequestKind, secs: u64) -> Result<CooldownState, StoreError> {
        let end = clock::add_secs(self.clock.now(), secs);
        store::put_json(self.store.as_ref(), &cooldown_key(kind), &CooldownRecord { end })?;
        Ok(self.evaluate(end))
    }

    pub fn clear(&self, kind: RequestKind) -> Result<(), StoreError> {
        self.store.remove(&cooldown_key(kind))
    }

    fn evaluate(&self, end: DateTime<Utc>) -> CooldownState {
        let left_ms = (end - self.clock.now()).num_milliseconds();
        if left_ms <= 0 {
            return CooldownState::CLEAR;
        }
        let seconds_remaining = u64::try_from(left_ms).unwrap_or(0).div_ceil(1000);
        CooldownState {
            active: true,
            seconds_remaining,
            end_timestamp: Some(end),
        }
    }
}

fn cooldown_key(kind: RequestKind) -> String {
    format!("cooldown:{kind}")
}
