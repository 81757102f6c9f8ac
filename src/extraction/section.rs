use serde::{Deserialize, Serialize};

/// The fixed set of report sections, in display order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
)]
pub enum Section {
    #[strum(serialize = "Executive Summary")]
    ExecutiveSummary,
    #[strum(serialize = "Emotional Profile")]
    EmotionalProfile,
    #[strum(serialize = "Mindset & Bias")]
    MindsetBias,
    #[strum(serialize = "Style & Delivery")]
    StyleDelivery,
    #[strum(serialize = "Strategy & Fit")]
    StrategyFit,
    #[strum(serialize = "Language Notes")]
    LanguageNotes,
    #[strum(serialize = "Reliability")]
    Reliability,
}

/// Substituted for any section name outside the fixed set.
pub const UNKNOWN_SECTION_DEFAULT: &str = "No information provided.";

impl Section {
    pub const ALL: [Self; 7] = [
        Self::ExecutiveSummary,
        Self::EmotionalProfile,
        Self::MindsetBias,
        Self::StyleDelivery,
        Self::StrategyFit,
        Self::LanguageNotes,
        Self::Reliability,
    ];

    /// Text used when no strategy recovers the section.
    pub fn default_text(self) -> &'static str {
        match self {
            Self::ExecutiveSummary => "No high-level synthesis or recommendations were provided.",
            _ => "None detected.",
        }
    }

    /// Header patterns to try, in order. Each is a regex fragment that
    /// stands in for the section title.
    ///
    /// The emotional profile header is often wrapped or numbered in ways the
    /// generic strategies miss, so it carries two extra variants.
    pub fn header_fragments(self) -> Vec<String> {
        let mut fragments = vec![regex::escape(&self.to_string())];
        if self == Self::EmotionalProfile {
            fragments.push(r"\d+\.?\s*Emotional Profile".into());
            fragments.push(r"\*\*Emotional Profile\*\*".into());
        }
        fragments
    }

    pub fn from_title(title: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|section| section.to_string().eq_ignore_ascii_case(title.trim()))
    }
}

/// Default text for an arbitrary section title.
pub fn default_for_title(title: &str) -> &'static str {
    Section::from_title(title).map_or(UNKNOWN_SECTION_DEFAULT, Section::default_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titles_round_trip_through_display() {
        for section in Section::ALL {
            assert_eq!(Section::from_title(&section.to_string()), Some(section));
        }
        assert_eq!(Section::from_title("mindset & bias"), Some(Section::MindsetBias));
    }

    #[test]
    fn defaults_are_section_specific() {
        assert_eq!(
            default_for_title("Executive Summary"),
            "No high-level synthesis or recommendations were provided."
        );
        assert_eq!(default_for_title("Reliability"), "None detected.");
        assert_eq!(default_for_title("Weather"), UNKNOWN_SECTION_DEFAULT);
    }

    #[test]
    fn header_fragments_match_their_titles() {
        let fragments = Section::StyleDelivery.header_fragments();
        assert_eq!(fragments.len(), 1);
        let re = regex::Regex::new(&fragments[0]).unwrap();
        assert!(re.is_match("5. Style & Delivery:"));
        assert_eq!(Section::EmotionalProfile.header_fragments().len(), 3);
    }
}
