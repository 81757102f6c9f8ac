use std::fmt::Write as _;
use tonegate::Config;
use tonegate::admission::{CooldownState, QuotaStatus, RequestKind};
use tonegate::session::{Phase, SessionSnapshot};

pub fn render_status(config: &Config) -> String {
    let storage = if config.storage.in_memory {
        "in-memory".to_string()
    } else {
        config.storage.state_db_path().display().to_string()
    };
    let lines = [
        "◆ tonegate status".to_string(),
        String::new(),
        format!("Version      {}", env!("CARGO_PKG_VERSION")),
        format!("Config       {}", config.config_path.display()),
        format!("State        {storage}"),
        String::new(),
        format!("  Endpoint   {}", config.api_base_url),
        format!("  Model      {}", config.model),
        format!("  Whisper    {}", config.transcription_model),
        format!(
            "  API key    {}",
            if config.api_key.is_some() { "set" } else { "missing" }
        ),
        String::new(),
        format!(
            "  Limits     {} text / {} audio per day ({:?} reset)",
            config.admission.text_daily_limit,
            config.admission.audio_daily_limit,
            config.admission.reset
        ),
        format!(
            "  Cooldowns  {}s text, {}s audio, {}-{}s after throttling",
            config.admission.text_cooldown_secs,
            config.admission.audio_cooldown_secs,
            config.admission.throttle_cooldown_min_secs,
            config.admission.throttle_cooldown_max_secs
        ),
        format!(
            "  Retries    {} attempts, {}s timeout",
            config.transport.max_attempts, config.transport.timeout_secs
        ),
        format!("  Mode       {}", config.session.default_mode),
    ];
    lines.join("\n")
}

pub fn render_quota(kind: RequestKind, quota: &QuotaStatus, cooldown: &CooldownState) -> String {
    let mut line = format!(
        "{kind:<6} {}/{} remaining, resets {}",
        quota.remaining,
        quota.limit,
        quota.reset_at.format("%Y-%m-%d %H:%M UTC")
    );
    if cooldown.active {
        let _ = write!(line, " (cooling down {}s)", cooldown.seconds_remaining);
    }
    line
}

/// Human-readable session state for the CLI.
pub fn render_snapshot(snapshot: &SessionSnapshot) -> String {
    let mut blocks = Vec::new();
    if let Some(notice) = &snapshot.notice {
        blocks.push(format!("! {notice}"));
    }
    if let Some(report) = &snapshot.report {
        blocks.push(report.render().trim_end().to_string());
    } else if snapshot.phase == Phase::Idle && snapshot.notice.is_none() {
        blocks.push("No analysis yet.".to_string());
    }
    if let Some(draft) = &snapshot.variant {
        blocks.push(format!("── {} ──\n{}", draft.tone, draft.render()));
    }
    if snapshot.report.is_some() {
        blocks.push(format!(
            "[{} mode, {} tone changes left]",
            snapshot.mode, snapshot.variants_remaining
        ));
    }
    blocks.join("\n\n")
}
