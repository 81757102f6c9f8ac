use super::clean::strip_bullets;
use super::section::Section;
use super::sentiment::{SentimentLabel, confidence_percent, extract_confidence, extract_sentiment};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;

const EMOTIONS_TITLE: &str = "Identified Emotions & Supporting Examples";

/// Structured view of one analysis response.
///
/// Every [`Section`] is always present: either extracted text or the
/// section's default.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuredReport {
    pub sentiment: SentimentLabel,
    /// Whole percent, `0..=100`.
    pub confidence: u8,
    sections: BTreeMap<Section, String>,
    /// The optional per-emotion evidence block.
    pub emotions: Option<String>,
    /// Sections that fell back to their default text.
    #[serde(skip)]
    pub defaulted: Vec<Section>,
}

impl StructuredReport {
    /// Build a report from raw model text. Total: never fails.
    pub fn extract(raw: &str) -> Self {
        let mut sections = BTreeMap::new();
        let mut defaulted = Vec::new();
        for section in Section::ALL {
            let text = super::extract_section(raw, section).unwrap_or_else(|| {
                tracing::debug!(%section, "Section not found; using default");
                defaulted.push(section);
                section.default_text().to_string()
            });
            sections.insert(section, text);
        }

        let emotions = super::extract_block(raw, EMOTIONS_TITLE)
            .map(|block| strip_bullets(&block))
            .filter(|block| !block.trim().is_empty());

        Self {
            sentiment: extract_sentiment(raw),
            confidence: confidence_percent(extract_confidence(raw)),
            sections,
            emotions,
            defaulted,
        }
    }

    pub fn section(&self, section: Section) -> &str {
        self.sections
            .get(&section)
            .map_or(section.default_text(), String::as_str)
    }

    pub fn sections(&self) -> impl Iterator<Item = (Section, &str)> {
        Section::ALL
            .into_iter()
            .map(move |section| (section, self.section(section)))
    }

    pub fn is_degraded(&self) -> bool {
        !self.defaulted.is_empty()
    }

    /// Plain-text rendering with numbered headings.
    pub fn render(&self) -> String {
        let mut out = format!(
            "Overall Sentiment: {} ({}% confidence)\n",
            self.sentiment, self.confidence
        );
        for (index, (section, text)) in self.sections().enumerate() {
            let _ = write!(out, "\n{}. {section}\n{text}\n", index + 1);
        }
        if let Some(emotions) = &self.emotions {
            let _ = write!(out, "\n{EMOTIONS_TITLE}\n{emotions}\n");
        }
        out
    }
}
