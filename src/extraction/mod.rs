//! Section extraction: turns free-form model output into a
//! [`StructuredReport`] using an ordered chain of tolerant patterns.

pub mod clean;
pub mod report;
pub mod section;
pub mod sentiment;
pub mod strategy;

pub use clean::{clean_extracted_section, strip_bullets};
pub use report::StructuredReport;
pub use section::{Section, UNKNOWN_SECTION_DEFAULT, default_for_title};
pub use sentiment::{SentimentLabel, extract_confidence, extract_sentiment};
pub use strategy::{STRATEGIES, StopAt, Strategy};

/// Extract and clean one report section. `None` when every strategy fails.
pub fn extract_section(text: &str, section: Section) -> Option<String> {
    extract_with_fragments(text, &section.header_fragments(), StopAt::NextNumberedSection)
}

/// Extract a section by free-form title, e.g. an optional block the fixed
/// catalogue does not cover.
pub fn extract_titled(text: &str, title: &str) -> Option<String> {
    extract_with_fragments(text, &[regex::escape(title)], StopAt::NextNumberedSection)
}

/// Extract an unnumbered block such as a bullet list, ending at the next
/// `Label:` line rather than the next ordinal.
pub fn extract_block(text: &str, title: &str) -> Option<String> {
    extract_with_fragments(text, &[regex::escape(title)], StopAt::NextLabeledBlock)
}

/// Extracted text for `title`, or its default.
pub fn section_or_default(text: &str, title: &str) -> String {
    extract_titled(text, title).unwrap_or_else(|| default_for_title(title).to_string())
}

/// Parse a complete report.
pub fn extract_report(raw: &str) -> StructuredReport {
    StructuredReport::extract(raw)
}

/// Try each header fragment through the full strategy chain.
///
/// A capture that cleans down to nothing counts as a miss.
fn extract_with_fragments(text: &str, fragments: &[String], stop: StopAt) -> Option<String> {
    fragments.iter().find_map(|fragment| {
        STRATEGIES.iter().find_map(|strategy| {
            let raw = (strategy.apply)(text, fragment, stop)?;
            let cleaned = clean_extracted_section(&raw);
            if cleaned.is_empty() {
                tracing::debug!(strategy = strategy.name, fragment, "Capture was empty after cleaning");
                return None;
            }
            tracing::trace!(strategy = strategy.name, fragment, "Section matched");
            Some(cleaned)
        })
    })
}
