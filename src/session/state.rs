use super::email::EmailDraft;
use super::{InteractionMode, Tone};
use crate::error::Rejection;
use crate::extraction::StructuredReport;
use serde::Serialize;
use std::sync::Arc;

/// Where the current analysis is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Submitting,
    Extracted,
    GeneratingVariant,
}

impl Phase {
    /// Phases from which a tone variant may be requested.
    pub fn has_report(self) -> bool {
        matches!(self, Self::Extracted | Self::GeneratingVariant)
    }
}

/// Bounded count of tone changes for one base analysis.
///
/// Slots are reserved when a variant is requested and released if the
/// generation fails, so only successful generations count against the cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToneVariantCounter {
    used: u32,
    max: u32,
}

impl ToneVariantCounter {
    pub const DEFAULT_MAX: u32 = 5;

    pub fn new(max: u32) -> Self {
        Self { used: 0, max }
    }

    pub fn try_reserve(&mut self) -> Result<(), Rejection> {
        if self.used >= self.max {
            return Err(Rejection::VariantCapReached { max: self.max });
        }
        self.used += 1;
        Ok(())
    }

    pub fn release(&mut self) {
        self.used = self.used.saturating_sub(1);
    }

    pub fn reset(&mut self) {
        self.used = 0;
    }

    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn remaining(&self) -> u32 {
        self.max.saturating_sub(self.used)
    }
}

impl Default for ToneVariantCounter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX)
    }
}

/// Everything a UI needs to render the session, published on every change.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub mode: InteractionMode,
    pub report: Option<Arc<StructuredReport>>,
    pub variant: Option<EmailDraft>,
    pub active_tone: Option<Tone>,
    pub variants_remaining: u32,
    /// User-facing message from the last rejection or failure.
    pub notice: Option<String>,
}
