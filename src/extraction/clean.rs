use regex::Regex;
use std::sync::LazyLock;

/// A numbered header line that leaked into a capture, with its content.
static LEAKED_HEADER_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\n\s*\d+\s*\.?\s*[A-Za-z\s&]+(?:\([^)]*\))?:.+").expect("leaked header regex")
});

/// An inline numbered header reference such as `3. Emotional Profile: **`.
static EMBEDDED_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*\d+\s*\.?\s*[A-Za-z\s&]+(?:\([^)]*\))?:\s*\*?\*?")
        .expect("embedded header regex")
});

/// Leading dashes, asterisks and typographic hyphens on a line.
static BULLET_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[-\x{2010}-\x{2015}*]+\s*)+")
        .expect("bullet prefix regex")
});

/// Strip leaked headers, emphasis markers and bullet glyphs from a capture.
///
/// Every pass only deletes text, so repeating until nothing changes
/// terminates and makes the result a fixed point: `clean(clean(x)) == clean(x)`.
pub fn clean_extracted_section(text: &str) -> String {
    let mut current = text.trim().to_string();
    loop {
        let next = clean_once(&current);
        if next == current {
            return next;
        }
        current = next;
    }
}

fn clean_once(text: &str) -> String {
    let text = LEAKED_HEADER_LINE.replace_all(text, "");
    let text = EMBEDDED_HEADER.replace_all(&text, "");
    let text = text.replace("**", "");
    strip_bullets(&text).trim().to_string()
}

/// Remove list glyphs at the start of every line.
pub fn strip_bullets(text: &str) -> String {
    text.split('\n')
        .map(|line| BULLET_PREFIX.replace(line, ""))
        .collect::<Vec<_>>()
        .join("\n")
}
