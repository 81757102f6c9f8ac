//! Report/mode state machine: interaction modes, tone variants and the
//! orchestrator that drives analyses through admission, queue and transport.

pub mod email;
pub mod orchestrator;
pub mod prompts;
pub mod safety;
pub mod state;

pub use email::{EmailDraft, split_subject, word_count};
pub use orchestrator::{Orchestrator, OrchestratorSettings};
pub use safety::{ContentFilter, REFUSAL_MESSAGE, screen_input};
pub use state::{Phase, SessionSnapshot, ToneVariantCounter};

use serde::{Deserialize, Serialize};

/// What the user wants from the submitted text. Changed only by explicit
/// selection.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum InteractionMode {
    /// Proofread or rewrite the user's own draft.
    Draft,
    /// Write a reply to a received message.
    Respond,
    /// Report only; tones rewrite the original text.
    #[default]
    Analyze,
}

impl InteractionMode {
    /// Tone generated automatically after a base analysis, if any.
    pub fn default_tone(self) -> Option<Tone> {
        match self {
            Self::Draft => Some(Tone::Proofread),
            Self::Respond => Some(Tone::Professional),
            Self::Analyze => None,
        }
    }

    pub fn supports(self, tone: Tone) -> bool {
        tone != Tone::Proofread || self == Self::Draft
    }

    pub fn tones(self) -> impl Iterator<Item = Tone> {
        Tone::ALL.into_iter().filter(move |tone| self.supports(*tone))
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Tone {
    Proofread,
    Professional,
    Formal,
    Casual,
    Friendly,
}

impl Tone {
    pub const ALL: [Self; 5] = [
        Self::Proofread,
        Self::Professional,
        Self::Formal,
        Self::Casual,
        Self::Friendly,
    ];

    pub fn description(self) -> &'static str {
        match self {
            Self::Proofread => {
                "Technical corrections only. Spelling, grammar and punctuation are fixed while wording, structure and voice stay exactly as written."
            }
            Self::Professional => {
                "Clear, direct, and efficient language. Respectful but not overly formal. Uses some contractions, focuses on facts and solutions, polite but straight to the point."
            }
            Self::Formal => {
                "Highly structured, proper language, no contractions or slang, respectful addresses, use of full titles, avoids personal anecdotes, maintains distance and authoritative voice."
            }
            Self::Casual => {
                "Relaxed language with contractions, some slang (but still professional), uses first names, includes some personal touches, more conversational flow, friendly tone."
            }
            Self::Friendly => {
                "Warm and personable, uses encouraging language, personal anecdotes where appropriate, expresses empathy, conversational style with questions, shows genuine care and interest."
            }
        }
    }
}
