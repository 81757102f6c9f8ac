//! Layered admission control: a per-kind cooldown gate in front of a daily
//! quota gate. Both reject with a recoverable [`Rejection`](crate::error::Rejection).

pub mod controller;
pub mod cooldown;
pub mod quota;

pub use controller::{AdmissionController, AdmissionPolicy, Admitted};
pub use cooldown::{CooldownState, CooldownStore};
pub use quota::{QuotaDecision, QuotaStatus, QuotaStore, QuotaWindow, ResetPolicy};

use serde::{Deserialize, Serialize};

/// Request category. Cooldowns and quotas are tracked independently per kind.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RequestKind {
    Text,
    Audio,
}
