//! Ordered extraction strategies.
//!
//! Each strategy is a pure function from the model text and a header
//! fragment to the raw (uncleaned) body of that section. The header regex
//! finds the first header; the body then runs up to the earliest match of
//! the strategy's stop pattern, or to the end of the text.
//!
//! Compiled patterns are cached by source text, so each header/stop pair is
//! built once per process.

use regex::{Regex, RegexBuilder};
use std::collections::HashMap;
use std::sync::{LazyLock, Mutex, PoisonError};

/// Where the primary strategy ends a section body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopAt {
    /// The next ordinal-marked header (`4.`, `**5:` ...).
    NextNumberedSection,
    /// The next line that opens a new `Label:` block, numbered or not.
    NextLabeledBlock,
}

pub type StrategyFn = fn(&str, &str, StopAt) -> Option<String>;

/// One named pattern-matching attempt.
#[derive(Clone, Copy)]
pub struct Strategy {
    pub name: &'static str,
    pub apply: StrategyFn,
}

impl std::fmt::Debug for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Strategy").field("name", &self.name).finish()
    }
}

/// Strategies in the order they are tried.
pub const STRATEGIES: [Strategy; 5] = [
    Strategy {
        name: "numbered_block",
        apply: numbered_block,
    },
    Strategy {
        name: "emphasized_header",
        apply: emphasized_header,
    },
    Strategy {
        name: "bare_label",
        apply: bare_label,
    },
    Strategy {
        name: "ordinal_plain",
        apply: ordinal_plain,
    },
    Strategy {
        name: "blank_line",
        apply: blank_line,
    },
];

const QUALIFIER: &str = r"(?:\s*\(.*?\))?";
const LABEL_STOP: &str = r"\n\s*\d+|\n\s*[A-Za-z]+:";

/// Optional ordinal or emphasis, the title, an optional parenthetical and a
/// colon, at the start of the text or of a line.
pub fn numbered_block(text: &str, fragment: &str, stop: StopAt) -> Option<String> {
    let header = format!(r"(?:\A|\n)\s*(?:\*\*)?\s*(?:\d+\.?\s*)?{fragment}{QUALIFIER}:\s*(?:\*\*)?\s*");
    let stop = match stop {
        StopAt::NextNumberedSection => r"\n\s*(?:\*\*)?\s*\d+[.:][\s\S]",
        StopAt::NextLabeledBlock => r"\n\s*(?:\*\*)?\s*(?:\d+[.:)]\s*)?[A-Za-z][^\n:]{0,60}:",
    };
    capture(text, &header, stop)
}

/// `**Title:**` with no ordinal, running to the next bold line.
pub fn emphasized_header(text: &str, fragment: &str, _stop: StopAt) -> Option<String> {
    capture(text, &format!(r"\*\*\s*{fragment}{QUALIFIER}:\*\*\s*"), r"\n\*\*")
}

/// `Title: body` anywhere, with no markers.
pub fn bare_label(text: &str, fragment: &str, _stop: StopAt) -> Option<String> {
    capture(text, &format!(r"{fragment}{QUALIFIER}:\s*"), LABEL_STOP)
}

/// `3. Title` without emphasis, the colon optional when the title ends the
/// line.
pub fn ordinal_plain(text: &str, fragment: &str, _stop: StopAt) -> Option<String> {
    capture(
        text,
        &format!(r"\d+[.)]?\s*{fragment}{QUALIFIER}(?::|[ \t]*\n)\s*"),
        LABEL_STOP,
    )
}

/// `Title: body` running to the next blank line.
pub fn blank_line(text: &str, fragment: &str, _stop: StopAt) -> Option<String> {
    capture(
        text,
        &format!(r"{fragment}{QUALIFIER}:\s*"),
        r"\n\n|\n\s*[A-Za-z]+:",
    )
}

/// Body after the first `header` match, trimmed; `None` when absent or blank.
fn capture(text: &str, header: &str, stop: &str) -> Option<String> {
    let header = compiled(header)?;
    let stop = compiled(stop)?;
    let found = header.find(text)?;
    let rest = &text[found.end()..];
    let body = stop.find(rest).map_or(rest, |m| &rest[..m.start()]);
    let body = body.trim();
    (!body.is_empty()).then(|| body.to_string())
}

static PATTERNS: LazyLock<Mutex<HashMap<String, Option<Regex>>>> = LazyLock::new(Mutex::default);

/// Case-insensitive regex for `pattern`, built on first use. Invalid
/// patterns are remembered as `None`.
fn compiled(pattern: &str) -> Option<Regex> {
    let mut cache = PATTERNS.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(regex) = cache.get(pattern) {
        return regex.clone();
    }
    let regex = RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| tracing::debug!(pattern, "Skipping invalid extraction pattern: {e}"))
        .ok();
    cache.insert(pattern.to_string(), regex.clone());
    regex
}
