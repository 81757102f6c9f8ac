use super::section::Section;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Classification buckets the analysis prompt asks the model to choose from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, strum::Display,
)]
pub enum SentimentLabel {
    #[strum(serialize = "Very Positive")]
    VeryPositive,
    Positive,
    #[default]
    Neutral,
    Negative,
    #[strum(serialize = "Very Negative")]
    VeryNegative,
    Mixed,
    Uncertain,
}

impl SentimentLabel {
    pub fn parse(label: &str) -> Option<Self> {
        let normalized = label
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_lowercase();
        match normalized.as_str() {
            "very positive" => Some(Self::VeryPositive),
            "positive" => Some(Self::Positive),
            "neutral" => Some(Self::Neutral),
            "negative" => Some(Self::Negative),
            "very negative" => Some(Self::VeryNegative),
            "mixed" => Some(Self::Mixed),
            "uncertain" => Some(Self::Uncertain),
            _ => None,
        }
    }
}

/// Confidence used when the model states none.
pub const DEFAULT_CONFIDENCE: f64 = 0.9;

/// Below this, an explicit label is cross-checked against the summary.
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.6;

static SENTIMENT_TEMPLATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\*\*1\.\s*Overall Sentiment:\*\*\s*([A-Za-z]+(?:[ \t]+[A-Za-z]+)?)")
        .expect("templated sentiment regex")
});

static SENTIMENT_LOOSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Overall Sentiment:\s*(?:\*+\s*)?([A-Za-z]+(?:[ \t]+[A-Za-z]+)?)")
        .expect("loose sentiment regex")
});

static CONFIDENCE_TEMPLATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\*\*2\.\s*Confidence Level:\*\*\s*(\d+(?:\.\d+)?|\.\d+)")
        .expect("templated confidence regex")
});

static CONFIDENCE_LOOSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Confidence Level:\s*(?:\*+\s*)?(\d+(?:\.\d+)?|\.\d+)")
        .expect("loose confidence regex")
});

static SUMMARY_SENTIMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)sentiment (?:is|of the text is) (positive|negative|neutral)")
        .expect("summary sentiment regex")
});

/// Stated confidence as a fraction, or [`DEFAULT_CONFIDENCE`].
pub fn extract_confidence(text: &str) -> f64 {
    CONFIDENCE_TEMPLATE
        .captures(text)
        .or_else(|| CONFIDENCE_LOOSE.captures(text))
        .and_then(|caps| caps[1].parse::<f64>().ok())
        .map_or(DEFAULT_CONFIDENCE, |percent| percent / 100.0)
}

/// Confidence as a whole percentage in `0..=100`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn confidence_percent(confidence: f64) -> u8 {
    // Clamped first, so the cast cannot truncate.
    (confidence * 100.0).round().clamp(0.0, 100.0) as u8
}

/// The explicitly stated label, if it names a known bucket.
fn stated_label(text: &str) -> Option<SentimentLabel> {
    let caps = SENTIMENT_TEMPLATE
        .captures(text)
        .or_else(|| SENTIMENT_LOOSE.captures(text))?;
    let phrase = caps.get(1)?.as_str();
    SentimentLabel::parse(phrase).or_else(|| {
        phrase
            .split_whitespace()
            .next()
            .and_then(SentimentLabel::parse)
    })
}

/// Overall sentiment with the summary cross-check.
///
/// Order: the stated label is used unless it is missing, is `Neutral`, or
/// the stated confidence is below [`LOW_CONFIDENCE_THRESHOLD`]. In those
/// cases an explicit "sentiment is X" phrase in the executive summary wins.
/// Otherwise the stated label stands, defaulting to `Neutral`.
pub fn extract_sentiment(text: &str) -> SentimentLabel {
    let stated = stated_label(text);
    let needs_cross_check = stated.is_none_or(|label| label == SentimentLabel::Neutral)
        || extract_confidence(text) < LOW_CONFIDENCE_THRESHOLD;

    if needs_cross_check {
        let summary = super::extract_section(text, Section::ExecutiveSummary);
        if let Some(mentioned) = summary
            .as_deref()
            .and_then(|summary| SUMMARY_SENTIMENT.captures(summary))
            .and_then(|caps| SentimentLabel::parse(&caps[1]))
        {
            tracing::debug!(?stated, %mentioned, "Sentiment taken from executive summary");
            return mentioned;
        }
    }

    stated.unwrap_or_default()
}
