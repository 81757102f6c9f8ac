//! Content checks on both sides of the provider call.
//!
//! Outbound: user text is screened for injection markers before admission.
//! Inbound: every generated variant passes [`ContentFilter`] before it is
//! shown.

use regex::{Regex, RegexSet};
use std::sync::LazyLock;

/// Shown instead of generated text that trips the content filter.
pub const REFUSAL_MESSAGE: &str = "I cannot generate that response as it may contain inappropriate content. Please review your request and try again with more professional language.";

static BLOCKED_CONTENT: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        // Profanity.
        r"(?i)\b(?:fuck|shit|ass|bitch|cunt|damn|dick|cock|pussy|whore|slut)\b",
        // Self-harm phrasing.
        r"(?i)\b(?:kill|suicide|die|death|murder|hanging|shoot)\b.*\b(?:yourself|myself|themselves|himself|herself)\b",
        // Hate-speech markers.
        r"(?i)\b(?:racist|nazi|hitler|supremac|genocide)\b",
    ])
    .expect("content filter patterns")
});

static INJECTION_MARKERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)eval\s*\(|exec\s*\(|system\s*\(|<script|drop\s+table|delete\s+from|update\s+\S+\s+set\b",
    )
    .expect("injection marker regex")
});

/// Verdict on one piece of generated text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOutcome {
    Passed(String),
    Rejected,
}

impl FilterOutcome {
    /// The text to display.
    pub fn into_display_text(self) -> String {
        match self {
            Self::Passed(text) => text,
            Self::Rejected => REFUSAL_MESSAGE.to_string(),
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected)
    }
}

/// Post-generation filter. Applied unconditionally before render.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentFilter;

impl ContentFilter {
    pub fn check(self, text: &str) -> FilterOutcome {
        if BLOCKED_CONTENT.is_match(text) {
            tracing::info!("Generated text replaced by content filter");
            FilterOutcome::Rejected
        } else {
            FilterOutcome::Passed(text.to_string())
        }
    }
}

/// Reject input that looks like an injection attempt.
pub fn screen_input(text: &str) -> Result<(), String> {
    match INJECTION_MARKERS.find(text) {
        Some(found) => Err(format!(
            "input contains a disallowed pattern ({})",
            found.as_str().trim()
        )),
        None => Ok(()),
    }
}
