use tonegate::extraction::{Section, SentimentLabel, StructuredReport};

use super::backend::NUMBERED_REPORT;

#[test]
fn full_numbered_report_extracts_every_section() {
    let report = StructuredReport::extract(NUMBERED_REPORT);
    assert!(!report.is_degraded());
    assert_eq!(report.sentiment, SentimentLabel::Positive);
    assert_eq!(report.confidence, 82);
    assert_eq!(
        report.section(Section::ExecutiveSummary),
        "The writer is enthusiastic about the launch and wants quick alignment."
    );
    assert_eq!(
        report.section(Section::EmotionalProfile),
        "Joy (High): \"so excited to share\"\nAnticipation (Moderate): \"can't wait\""
    );
    assert_eq!(
        report.section(Section::MindsetBias),
        "Optimism bias about the timeline."
    );
    assert_eq!(
        report.section(Section::Reliability),
        "Few hedges; claims are stated with certainty."
    );
}

#[test]
fn truncated_response_falls_back_to_defaults() {
    let raw = "**1. Overall Sentiment:** Negative\n*Confidence Level:* 70%\n\n\
        **2. Executive Summary:**\nThe customer is frustrated by repeated delays.\n\n\
        **3. Emotional Profile:**\nAnger (High): \"third time this month\"";
    let report = StructuredReport::extract(raw);
    assert!(report.is_degraded());
    assert_eq!(report.sentiment, SentimentLabel::Negative);
    assert_eq!(report.confidence, 70);
    assert_eq!(
        report.section(Section::EmotionalProfile),
        "Anger (High): \"third time this month\""
    );
    for section in [
        Section::MindsetBias,
        Section::StyleDelivery,
        Section::StrategyFit,
        Section::LanguageNotes,
        Section::Reliability,
    ] {
        assert_eq!(report.section(section), "None detected.", "{section}");
        assert!(report.defaulted.contains(&section));
    }
}

#[test]
fn empty_response_is_still_a_complete_report() {
    let report = StructuredReport::extract("");
    assert_eq!(report.sentiment, SentimentLabel::Neutral);
    assert_eq!(report.confidence, 90);
    assert_eq!(
        report.section(Section::ExecutiveSummary),
        "No high-level synthesis or recommendations were provided."
    );
    assert_eq!(report.sections().count(), Section::ALL.len());
}

#[test]
fn low_confidence_label_yields_to_summary_phrase() {
    let raw = "**1. Overall Sentiment:** Positive\n*Confidence Level:* 40%\n\n\
        **2. Executive Summary:**\nOverall the sentiment is negative despite polite wording.\n";
    let report = StructuredReport::extract(raw);
    assert_eq!(report.sentiment, SentimentLabel::Negative);
    assert_eq!(report.confidence, 40);
}

#[test]
fn identified_emotions_block_is_kept_when_present() {
    let raw = format!(
        "{NUMBERED_REPORT}\n**Identified Emotions & Supporting Examples:**\n- Joy: \"so excited\"\n- Hope: \"fingers crossed\""
    );
    let report = StructuredReport::extract(&raw);
    assert_eq!(
        report.emotions.as_deref(),
        Some("Joy: \"so excited\"\nHope: \"fingers crossed\"")
    );
    assert!(StructuredReport::extract(NUMBERED_REPORT).emotions.is_none());
}

#[test]
fn rendered_report_lists_sections_in_order() {
    let rendered = StructuredReport::extract(NUMBERED_REPORT).render();
    let summary = rendered.find("1. Executive Summary").unwrap();
    let reliability = rendered.find("7. Reliability").unwrap();
    assert!(summary < reliability);
    assert!(rendered.starts_with("Overall Sentiment: Positive (82% confidence)"));
}
