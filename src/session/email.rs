use super::Tone;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// Allowed difference between input and proofread output word counts.
const PROOFREAD_WORD_TOLERANCE: usize = 2;

static SUBJECT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:\*\*)?\s*(?:suggested\s+)?subject\s*:\s*(?:\*\*)?\s*(.*?)\s*(?:\*\*)?\s*$")
        .expect("subject line regex")
});

/// A generated variant split for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailDraft {
    pub tone: Tone,
    pub subject: Option<String>,
    pub body: String,
}

impl EmailDraft {
    pub fn from_generated(tone: Tone, text: &str) -> Self {
        let (subject, body) = split_subject(text);
        Self {
            tone,
            subject,
            body,
        }
    }

    pub fn render(&self) -> String {
        match &self.subject {
            Some(subject) => format!("Subject: {subject}\n\n{}", self.body),
            None => self.body.clone(),
        }
    }
}

/// Split a leading `Suggested Subject:` / `Subject:` line off `text`.
pub fn split_subject(text: &str) -> (Option<String>, String) {
    let trimmed = text.trim();
    let (first, rest) = trimmed.split_once('\n').unwrap_or((trimmed, ""));
    match SUBJECT_LINE.captures(first) {
        Some(caps) if !caps[1].trim().is_empty() => {
            (Some(caps[1].trim().to_string()), rest.trim().to_string())
        }
        _ => (None, trimmed.to_string()),
    }
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Log when a proofread changed the word count more than corrections would.
///
/// Returns whether the output looked suspicious.
pub fn check_proofread_length(input: &str, output: &str) -> bool {
    let input_words = word_count(input);
    let output_words = word_count(output);
    let suspicious = input_words.abs_diff(output_words) > PROOFREAD_WORD_TOLERANCE;
    if suspicious {
        tracing::warn!(
            input_words,
            output_words,
            "Proofread output deviates in word count; possible hallucination"
        );
    }
    suspicious
}
