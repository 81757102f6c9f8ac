//! Prompt catalogue. Every request the orchestrator sends is built here.

use super::{InteractionMode, Tone};
use crate::extraction::{Section, StructuredReport};

/// System/user message pair for one completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

const SAFETY_CLAUSE: &str = "Never include inappropriate, offensive or harmful language, profanity, hate speech, slurs or defamatory content.";

const ANALYSIS_SYSTEM: &str = r"You are an expert communication analyst. Read the text and produce a professional tone and sentiment report.

Classify emotions (joy, sadness, anger, fear, surprise, disgust) by their wording, intensity markers and context, quoting the text as evidence.

OUTPUT FORMAT:

**1. Overall Sentiment:** [One of: Very Positive, Positive, Neutral, Negative, Very Negative, Mixed, Uncertain]
*Confidence Level:* [Your confidence as a percentage, e.g. 90%]

**2. Executive Summary:**
[A concise synthesis of the emotional and tonal landscape: key emotional drivers, communication style, persuasion goals and implications, followed by 2-3 prioritized recommendations.]

**3. Emotional Profile:**
[Primary emotions with quoted examples and an intensity (Low, Moderate, High) for each; note empathy or support and how the emotions combine.]

**4. Mindset & Bias:**
[Cognitive or confirmation biases, implicit assumptions, hidden meaning and the writer's underlying frame.]

**5. Style & Delivery:**
[Register (Formal, Semi-formal, Informal), urgency, directness of the call to action, tone shifts and assertion level, with excerpts.]

**6. Strategy & Fit:**
[Core intent, persuasive techniques and framing, and how the tone supports audience trust.]

**7. Language Notes:**
[Idioms, metaphors, cultural references, sarcasm and slang with plain explanations.]

**8. Reliability:**
[Hedging, qualifiers, contradictions or omissions that affect how certain the writer is.]";

/// Base analysis request. The numbered template is what the extraction
/// strategies are tuned for.
pub fn analysis(text: &str) -> Prompt {
    Prompt {
        system: ANALYSIS_SYSTEM.to_string(),
        user: format!("Analyze this text: \"{text}\""),
    }
}

/// Prompt for one tone variant of `original` in `mode`.
pub fn variant(mode: InteractionMode, tone: Tone, original: &str, report: &StructuredReport) -> Prompt {
    match (mode, tone) {
        (InteractionMode::Draft, Tone::Proofread) => proofread(original),
        (InteractionMode::Draft, tone) => draft_rewrite(tone, original),
        (InteractionMode::Respond, tone) => response(tone, original, report),
        (InteractionMode::Analyze, tone) => rewrite(tone, original),
    }
}

fn proofread(original: &str) -> Prompt {
    Prompt {
        system: format!(
            "You are a professional proofreader. Correct only spelling, grammar, punctuation and \
             clearly awkward structure. Do not add, remove or rephrase content, and do not change \
             tone, format or style. Match the input's sentence count and keep slang and contractions. \
             If the input is quoted, return the corrected text still in quotes. Return only the \
             corrected text with no labels or metadata. {SAFETY_CLAUSE}"
        ),
        user: format!(
            "Proofread the following EXACTLY as written, making only technical corrections:\n\n\
             \"{original}\"\n\nReturn ONLY the corrected text with no additional formatting or content."
        ),
    }
}

fn draft_rewrite(tone: Tone, original: &str) -> Prompt {
    Prompt {
        system: format!(
            "You are an expert email writer. Rewrite the user's draft as a complete email in a {tone} \
             tone, which means: {description}\n\nPreserve the draft's content and intent. Begin with \
             \"Suggested Subject: <subject>\" on the first line, then a greeting suited to the content, \
             the body and a complimentary close. Never sign with a name. {SAFETY_CLAUSE}",
            description = tone.description()
        ),
        user: format!(
            "Original Email: \"{original}\"\n\nRewrite this email in a {tone} tone while preserving its \
             core content and meaning. Start with \"Suggested Subject:\". Do not write a response to it."
        ),
    }
}

fn response(tone: Tone, original: &str, report: &StructuredReport) -> Prompt {
    Prompt {
        system: format!(
            "You are an expert email response writer. Using the sentiment analysis provided, write a \
             reply in a {tone} tone, which means: {description}\n\nAcknowledge the original message, \
             address its key points and any unstated concerns, and close with a clear next step. \
             Start with \"Suggested Subject:\" and sign off with \"YOUR NAME HERE\". Keep it to \
             150-200 words, invent no facts or attachments, and never mention the analysis. {SAFETY_CLAUSE}",
            description = tone.description()
        ),
        user: format!(
            "Original Message: \"{original}\"\n\nSentiment Analysis:\n\
             - Overall Sentiment: {sentiment}\n\
             - Confidence Level: {confidence}%\n\
             - Executive Summary: {summary}\n\
             - Emotional Profile: {profile}\n\
             - Mindset & Bias: {mindset}\n\
             - Style & Delivery: {style}\n\n\
             Based on this sentiment analysis, generate a {tone} response to this message.",
            sentiment = report.sentiment,
            confidence = report.confidence,
            summary = report.section(Section::ExecutiveSummary),
            profile = report.section(Section::EmotionalProfile),
            mindset = report.section(Section::MindsetBias),
            style = report.section(Section::StyleDelivery),
        ),
    }
}

fn rewrite(tone: Tone, original: &str) -> Prompt {
    Prompt {
        system: format!(
            "You are an expert writer. Rewrite the provided text in a {tone} tone, which means: \
             {description}\n\nKeep the same content and meaning. Do not reply to it, and add no \
             salutation or signature that was not in the original. {SAFETY_CLAUSE}",
            description = tone.description()
        ),
        user: format!("Rewrite this text in a {tone} tone:\n\n\"{original}\""),
    }
}
