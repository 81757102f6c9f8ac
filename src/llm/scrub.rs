use crate::error::TransportError;
use std::borrow::Cow;

const MAX_API_ERROR_CHARS: usize = 200;
const REDACTED: &str = "[REDACTED]";

/// Token prefixes that introduce a credential.
const SECRET_PREFIXES: [&str; 5] = ["sk-", "sess-", "Bearer ", "bearer ", "eyJ"];

/// Key/value markers whose value is a credential.
const SECRET_MARKERS: [&str; 8] = [
    "api_key=",
    "access_token=",
    "\"api_key\":\"",
    "\"access_token\":\"",
    "\"token\":\"",
    "\"secret\":\"",
    "\"password\":\"",
    "Authorization: ",
];

fn is_secret_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':' | '+' | '/' | '=')
}

/// Replace the token following each occurrence of `marker`.
///
/// When `keep_marker` is set the marker text itself survives so the reader
/// can still tell which field was redacted.
fn redact_after(text: &mut String, marker: &str, keep_marker: bool) {
    let mut from = 0;
    while let Some(rel) = text[from..].find(marker) {
        let start = from + rel;
        let value_start = start + marker.len();
        let value_end = text[value_start..]
            .find(|c: char| !is_secret_char(c))
            .map_or(text.len(), |offset| value_start + offset);

        if value_end == value_start {
            from = value_start;
            continue;
        }

        let replace_from = if keep_marker { value_start } else { start };
        text.replace_range(replace_from..value_end, REDACTED);
        from = replace_from + REDACTED.len();
    }
}

/// Redact API keys and bearer tokens from provider error text.
pub fn scrub_secret_patterns(input: &str) -> Cow<'_, str> {
    let hit = SECRET_PREFIXES
        .iter()
        .chain(SECRET_MARKERS.iter())
        .any(|pattern| input.contains(pattern));
    if !hit {
        return Cow::Borrowed(input);
    }

    let mut scrubbed = input.to_string();
    for prefix in SECRET_PREFIXES {
        redact_after(&mut scrubbed, prefix, false);
    }
    for marker in SECRET_MARKERS {
        redact_after(&mut scrubbed, marker, true);
    }
    Cow::Owned(scrubbed)
}

/// Scrub secrets and cap the length of a provider error body.
pub fn sanitize_api_error(input: &str) -> String {
    let scrubbed = scrub_secret_patterns(input.trim());
    match scrubbed.char_indices().nth(MAX_API_ERROR_CHARS) {
        Some((cut, _)) => format!("{}...", &scrubbed[..cut]),
        None => scrubbed.into_owned(),
    }
}

/// Turn a non-success response into a [`TransportError`].
///
/// 429 becomes [`TransportError::Throttled`] carrying any `Retry-After`
/// hint given in whole seconds.
pub async fn api_error(backend: &str, response: reqwest::Response) -> TransportError {
    let status = response.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());
        return TransportError::Throttled {
            backend: backend.to_string(),
            retry_after_secs,
        };
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read error body>".to_string());
    TransportError::Http {
        backend: backend.to_string(),
        status: status.as_u16(),
        message: sanitize_api_error(&body),
    }
}
