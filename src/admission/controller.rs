use super::cooldown::{CooldownState, CooldownStore};
use super::quota::{QuotaDecision, QuotaStatus, QuotaStore, ResetPolicy};
use super::RequestKind;
use crate::clock::Clock;
use crate::error::{GateError, Rejection};
use crate::identity::ClientIdentity;
use crate::store::StateStore;
use rand::Rng;
use std::ops::RangeInclusive;
use std::sync::Arc;

/// Tunables for both gates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionPolicy {
    pub text_cooldown_secs: u64,
    pub audio_cooldown_secs: u64,
    /// Randomized text cooldown applied after the provider throttles us.
    pub throttle_cooldown_secs: RangeInclusive<u64>,
    pub text_daily_limit: u32,
    pub audio_daily_limit: u32,
    pub reset: ResetPolicy,
}

impl Default for AdmissionPolicy {
    fn default() -> Self {
        Self {
            text_cooldown_secs: 5,
            audio_cooldown_secs: 5,
            throttle_cooldown_secs: 20..=30,
            text_daily_limit: 100,
            audio_daily_limit: 100,
            reset: ResetPolicy::CalendarDay,
        }
    }
}

impl AdmissionPolicy {
    pub fn cooldown_secs(&self, kind: RequestKind) -> u64 {
        match kind {
            RequestKind::Text => self.text_cooldown_secs,
            RequestKind::Audio => self.audio_cooldown_secs,
        }
    }

    pub fn daily_limit(&self, kind: RequestKind) -> u32 {
        match kind {
            RequestKind::Text => self.text_daily_limit,
            RequestKind::Audio => self.audio_daily_limit,
        }
    }
}

/// Proof that a request passed both gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admitted {
    pub kind: RequestKind,
    pub remaining_quota: u32,
}

/// Cooldown gate followed by the daily quota gate.
pub struct AdmissionController {
    client: ClientIdentity,
    policy: AdmissionPolicy,
    cooldowns: CooldownStore,
    quota: QuotaStore,
}

impl AdmissionController {
    pub fn new(
        client: ClientIdentity,
        policy: AdmissionPolicy,
        store: Arc<dyn StateStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let quota = QuotaStore::new(Arc::clone(&store), Arc::clone(&clock), policy.reset);
        Self {
            client,
            policy,
            cooldowns: CooldownStore::new(store, clock),
            quota,
        }
    }

    pub fn client(&self) -> &ClientIdentity {
        &self.client
    }

    pub fn policy(&self) -> &AdmissionPolicy {
        &self.policy
    }

    /// Run both gates for one request of `kind`.
    ///
    /// A cooldown rejection does not touch the quota. On admission the
    /// request is counted and the base cooldown for `kind` starts.
    pub fn admit(&self, kind: RequestKind) -> Result<Admitted, GateError> {
        if let Some(seconds_remaining) = self.cooldowns.remaining(kind)? {
            tracing::debug!(%kind, seconds_remaining, "Request rejected by cooldown gate");
            return Err(Rejection::Cooldown {
                kind,
                seconds_remaining,
            }
            .into());
        }

        let limit = self.policy.daily_limit(kind);
        match self
            .quota
            .check_and_consume(&self.client, kind, limit, true)?
        {
            QuotaDecision::Allowed { remaining } => {
                self.cooldowns.start(kind, self.policy.cooldown_secs(kind))?;
                tracing::info!(%kind, remaining, "Request admitted");
                Ok(Admitted {
                    kind,
                    remaining_quota: remaining,
                })
            }
            QuotaDecision::Denied { reset_at } => {
                tracing::info!(%kind, limit, %reset_at, "Daily quota exhausted");
                Err(Rejection::QuotaExhausted {
                    kind,
                    limit,
                    reset_at,
                }
                .into())
            }
        }
    }

    /// Escalate the cooldown after the provider throttled a request.
    ///
    /// Text gets a randomized window from `throttle_cooldown_secs`; audio
    /// restarts its base cooldown.
    pub fn on_throttled(&self, kind: RequestKind) -> Result<CooldownState, GateError> {
        let state = match kind {
            RequestKind::Text => {
                let secs = rand::rng().random_range(self.policy.throttle_cooldown_secs.clone());
                self.cooldowns.start(kind, secs)?
            }
            RequestKind::Audio => self
                .cooldowns
                .restart(kind, self.policy.audio_cooldown_secs)?,
        };
        tracing::warn!(
            %kind,
            seconds = state.seconds_remaining,
            "Provider throttled request; cooldown extended"
        );
        Ok(state)
    }

    pub fn cooldown(&self, kind: RequestKind) -> Result<CooldownState, GateError> {
        Ok(self.cooldowns.state(kind)?)
    }

    /// Remaining text quota for `client`. Never consumes.
    pub fn remaining_quota(&self, client: &ClientIdentity) -> Result<QuotaStatus, GateError> {
        self.remaining_quota_for(client, RequestKind::Text)
    }

    pub fn remaining_quota_for(
        &self,
        client: &ClientIdentity,
        kind: RequestKind,
    ) -> Result<QuotaStatus, GateError> {
        Ok(self
            .quota
            .peek(client, kind, self.policy.daily_limit(kind))?)
    }
}
