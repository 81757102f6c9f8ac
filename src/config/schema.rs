use crate::admission::{AdmissionPolicy, ResetPolicy};
use crate::error::ConfigError;
use crate::llm::{BackendSettings, RetryPolicy};
use crate::session::{InteractionMode, OrchestratorSettings};
use anyhow::{Context, Result};
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ── Top-level config ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,
    pub api_key: Option<String>,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_transcription_model")]
    pub transcription_model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default)]
    pub admission: AdmissionConfig,

    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub transport: TransportConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

fn default_api_base_url() -> String {
    "https://api.openai.com/v1".into()
}

fn default_model() -> String {
    "gpt-4-turbo".into()
}

fn default_transcription_model() -> String {
    "whisper-1".into()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens() -> u32 {
    1000
}

// ── Admission ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResetMode {
    /// Counters reset when the client's local calendar date changes.
    #[default]
    CalendarDay,
    /// Counters reset `window_secs` after the window opened.
    FixedWindow,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionConfig {
    #[serde(default = "default_cooldown_secs")]
    pub text_cooldown_secs: u64,
    #[serde(default = "default_cooldown_secs")]
    pub audio_cooldown_secs: u64,
    #[serde(default = "default_throttle_cooldown_min_secs")]
    pub throttle_cooldown_min_secs: u64,
    #[serde(default = "default_throttle_cooldown_max_secs")]
    pub throttle_cooldown_max_secs: u64,
    #[serde(default = "default_daily_limit")]
    pub text_daily_limit: u32,
    #[serde(default = "default_daily_limit")]
    pub audio_daily_limit: u32,
    #[serde(default)]
    pub reset: ResetMode,
    /// Only read when `reset = "fixed_window"`.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

/// Upper bound for any admission duration (one year).
const MAX_ADMISSION_SECS: u64 = 365 * 86_400;

fn default_cooldown_secs() -> u64 {
    5
}

fn default_throttle_cooldown_min_secs() -> u64 {
    20
}

fn default_throttle_cooldown_max_secs() -> u64 {
    30
}

fn default_daily_limit() -> u32 {
    100
}

fn default_window_secs() -> u64 {
    86_400
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            text_cooldown_secs: default_cooldown_secs(),
            audio_cooldown_secs: default_cooldown_secs(),
            throttle_cooldown_min_secs: default_throttle_cooldown_min_secs(),
            throttle_cooldown_max_secs: default_throttle_cooldown_max_secs(),
            text_daily_limit: default_daily_limit(),
            audio_daily_limit: default_daily_limit(),
            reset: ResetMode::default(),
            window_secs: default_window_secs(),
        }
    }
}

impl AdmissionConfig {
    pub fn policy(&self) -> AdmissionPolicy {
        AdmissionPolicy {
            text_cooldown_secs: self.text_cooldown_secs,
            audio_cooldown_secs: self.audio_cooldown_secs,
            throttle_cooldown_secs: self.throttle_cooldown_min_secs
                ..=self.throttle_cooldown_max_secs,
            text_daily_limit: self.text_daily_limit,
            audio_daily_limit: self.audio_daily_limit,
            reset: match self.reset {
                ResetMode::CalendarDay => ResetPolicy::CalendarDay,
                ResetMode::FixedWindow => ResetPolicy::FixedWindow {
                    period_secs: self.window_secs,
                },
            },
        }
    }
}

// ── Queue ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Pause between consecutive queued provider calls.
    #[serde(default = "default_spacing_ms")]
    pub spacing_ms: u64,
}

fn default_spacing_ms() -> u64 {
    1000
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            spacing_ms: default_spacing_ms(),
        }
    }
}

// ── Transport ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_throttle_base_delay_secs")]
    pub throttle_base_delay_secs: u64,
    #[serde(default = "default_network_base_delay_ms")]
    pub network_base_delay_ms: u64,
    #[serde(default = "default_true")]
    pub honor_retry_after: bool,
    /// Cap on computed backoff; a provider `Retry-After` is not capped.
    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_throttle_base_delay_secs() -> u64 {
    5
}

fn default_network_base_delay_ms() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}

fn default_max_backoff_secs() -> u64 {
    60
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            timeout_secs: default_timeout_secs(),
            throttle_base_delay_secs: default_throttle_base_delay_secs(),
            network_base_delay_ms: default_network_base_delay_ms(),
            honor_retry_after: true,
            max_backoff_secs: default_max_backoff_secs(),
        }
    }
}

impl TransportConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            throttle_base_delay: Duration::from_secs(self.throttle_base_delay_secs),
            network_base_delay: Duration::from_millis(self.network_base_delay_ms),
            honor_retry_after: self.honor_retry_after,
            max_backoff: Duration::from_secs(self.max_backoff_secs),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

// ── Session ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_max_input_words")]
    pub max_input_words: usize,
    #[serde(default = "default_max_variants")]
    pub max_variants: u32,
    #[serde(default = "default_max_audio_bytes")]
    pub max_audio_bytes: usize,
    #[serde(default)]
    pub default_mode: InteractionMode,
    #[serde(default = "default_transcription_language")]
    pub transcription_language: String,
}

fn default_max_input_words() -> usize {
    500
}

fn default_max_variants() -> u32 {
    5
}

fn default_max_audio_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_transcription_language() -> String {
    "en".into()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_input_words: default_max_input_words(),
            max_variants: default_max_variants(),
            max_audio_bytes: default_max_audio_bytes(),
            default_mode: InteractionMode::default(),
            transcription_language: default_transcription_language(),
        }
    }
}

// ── Storage ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite file holding client id, quota windows and cooldowns.
    /// `~` is expanded.
    #[serde(default = "default_state_db")]
    pub state_db: String,
    /// Keep state in memory only; quotas reset with the process.
    #[serde(default)]
    pub in_memory: bool,
}

fn default_state_db() -> String {
    "~/.tonegate/state.db".into()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_db: default_state_db(),
            in_memory: false,
        }
    }
}

impl StorageConfig {
    pub fn state_db_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.state_db).into_owned())
    }
}

// ── Observability ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// "error" | "warn" | "info" | "debug" | "trace"
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let home =
            UserDirs::new().map_or_else(|| PathBuf::from("."), |u| u.home_dir().to_path_buf());

        Self {
            config_path: home.join(".tonegate").join("config.toml"),
            api_key: None,
            api_base_url: default_api_base_url(),
            model: default_model(),
            transcription_model: default_transcription_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            admission: AdmissionConfig::default(),
            queue: QueueConfig::default(),
            transport: TransportConfig::default(),
            session: SessionConfig::default(),
            storage: StorageConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl Config {
    pub fn load_or_init() -> Result<Self> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("Could not find home directory")?;
        let tonegate_dir = home.join(".tonegate");
        if !tonegate_dir.exists() {
            fs::create_dir_all(&tonegate_dir).context("Failed to create .tonegate directory")?;
        }
        Self::load_or_init_at(&tonegate_dir.join("config.toml"))
    }

    /// Load `config_path`, writing defaults there first if it does not exist.
    pub fn load_or_init_at(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let contents = fs::read_to_string(config_path).context("Failed to read config file")?;
            let mut config: Config =
                toml::from_str(&contents).context("Failed to parse config file")?;
            // Set computed paths that are skipped during serialization
            config.config_path = config_path.to_path_buf();
            config.validate()?;
            Ok(config)
        } else {
            let config = Self {
                config_path: config_path.to_path_buf(),
                ..Self::default()
            };
            config.validate()?;
            config.save()?;
            Ok(config)
        }
    }

    /// Apply environment variable overrides to config
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        // API Key: TONEGATE_API_KEY or OPENAI_API_KEY
        if let Some(key) = non_empty("TONEGATE_API_KEY").or_else(|| non_empty("OPENAI_API_KEY")) {
            self.api_key = Some(key);
        }

        if let Some(model) = non_empty("TONEGATE_MODEL") {
            self.model = model;
        }

        if let Some(base_url) = non_empty("TONEGATE_BASE_URL") {
            self.api_base_url = base_url;
        }

        // Applies to both request kinds.
        if let Some(limit) = non_empty("TONEGATE_DAILY_LIMIT").and_then(|v| v.parse::<u32>().ok()) {
            self.admission.text_daily_limit = limit;
            self.admission.audio_daily_limit = limit;
        }

        if let Some(path) = non_empty("TONEGATE_STATE_DB") {
            self.storage.state_db = path;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let admission = &self.admission;
        if admission.text_daily_limit == 0 || admission.audio_daily_limit == 0 {
            return Err(ConfigError::Validation(
                "admission daily limits must be at least 1".into(),
            ));
        }
        if admission.throttle_cooldown_min_secs > admission.throttle_cooldown_max_secs {
            return Err(ConfigError::Validation(format!(
                "admission.throttle_cooldown_min_secs ({}) exceeds throttle_cooldown_max_secs ({})",
                admission.throttle_cooldown_min_secs, admission.throttle_cooldown_max_secs
            )));
        }
        for (name, secs) in [
            ("text_cooldown_secs", admission.text_cooldown_secs),
            ("audio_cooldown_secs", admission.audio_cooldown_secs),
            ("throttle_cooldown_max_secs", admission.throttle_cooldown_max_secs),
            ("window_secs", admission.window_secs),
        ] {
            if secs > MAX_ADMISSION_SECS {
                return Err(ConfigError::Validation(format!(
                    "admission.{name} ({secs}) exceeds one year ({MAX_ADMISSION_SECS}s)"
                )));
            }
        }
        if admission.reset == ResetMode::FixedWindow && admission.window_secs == 0 {
            return Err(ConfigError::Validation(
                "admission.window_secs must be positive for fixed_window resets".into(),
            ));
        }
        if self.transport.max_attempts == 0 {
            return Err(ConfigError::Validation(
                "transport.max_attempts must be at least 1".into(),
            ));
        }
        if self.transport.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "transport.timeout_secs must be positive".into(),
            ));
        }
        if self.session.max_input_words == 0 {
            return Err(ConfigError::Validation(
                "session.max_input_words must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn backend_settings(&self) -> BackendSettings {
        BackendSettings {
            api_key: self.api_key.clone(),
            base_url: self.api_base_url.clone(),
            model: self.model.clone(),
            transcription_model: self.transcription_model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            timeout_secs: self.transport.timeout_secs,
            transcription_language: self.session.transcription_language.clone(),
        }
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            max_input_words: self.session.max_input_words,
            max_variants: self.session.max_variants,
            max_audio_bytes: self.session.max_audio_bytes,
            queue_spacing: Duration::from_millis(self.queue.spacing_ms),
        }
    }

    pub fn save(&self) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        fs::write(&self.config_path, toml_str).context("Failed to write config file")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Mutex, OnceLock};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().unwrap()
    }

    // ── Defaults ─────────────────────────────────────────────

    #[test]
    fn config_default_has_sane_values() {
        let c = Config::default();
        assert_eq!(c.model, "gpt-4-turbo");
        assert_eq!(c.transcription_model, "whisper-1");
        assert!((c.temperature - 0.7).abs() < f64::EPSILON);
        assert!(c.api_key.is_none());
        assert!(c.config_path.to_string_lossy().contains("config.toml"));
        assert_eq!(c.admission.text_daily_limit, 100);
        assert_eq!(c.admission.reset, ResetMode::CalendarDay);
        assert_eq!(c.queue.spacing_ms, 1000);
        assert_eq!(c.session.max_variants, 5);
        c.validate().unwrap();
    }

    #[test]
    fn default_policies_match_admission_defaults() {
        let c = Config::default();
        assert_eq!(c.admission.policy(), AdmissionPolicy::default());
        assert_eq!(c.transport.retry_policy(), RetryPolicy::default());
        assert_eq!(c.orchestrator_settings(), OrchestratorSettings::default());
    }

    // ── Parsing ──────────────────────────────────────────────

    #[test]
    fn partial_toml_fills_defaults() {
        let c: Config = toml::from_str(
            r#"
api_key = "sk-test"

[admission]
text_daily_limit = 10
reset = "fixed_window"
window_secs = 3600
"#,
        )
        .unwrap();
        assert_eq!(c.api_key.as_deref(), Some("sk-test"));
        assert_eq!(c.admission.text_daily_limit, 10);
        assert_eq!(c.admission.audio_daily_limit, 100);
        assert_eq!(
            c.admission.policy().reset,
            ResetPolicy::FixedWindow { period_secs: 3600 }
        );
        assert_eq!(c.transport.max_attempts, 3);
    }

    #[test]
    fn load_or_init_writes_then_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut created = Config::load_or_init_at(&path).unwrap();
        assert!(path.exists());

        created.model = "gpt-4".into();
        created.session.default_mode = InteractionMode::Respond;
        created.save().unwrap();

        let loaded = Config::load_or_init_at(&path).unwrap();
        assert_eq!(loaded.model, "gpt-4");
        assert_eq!(loaded.session.default_mode, InteractionMode::Respond);
        assert_eq!(loaded.config_path, path);
    }

    // ── Validation ───────────────────────────────────────────

    #[test]
    fn validate_rejects_inverted_throttle_range() {
        let mut c = Config::default();
        c.admission.throttle_cooldown_min_secs = 40;
        assert!(matches!(c.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_rejects_zero_limits_and_attempts() {
        let mut c = Config::default();
        c.admission.text_daily_limit = 0;
        assert!(c.validate().is_err());

        let mut c = Config::default();
        c.transport.max_attempts = 0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn validate_rejects_admission_durations_over_a_year() {
        let mut c = Config::default();
        c.admission.reset = ResetMode::FixedWindow;
        c.admission.window_secs = u64::MAX;
        assert!(matches!(c.validate(), Err(ConfigError::Validation(_))));

        let mut c = Config::default();
        c.admission.text_cooldown_secs = 20_000_000_000_000;
        assert!(matches!(c.validate(), Err(ConfigError::Validation(_))));

        let mut c = Config::default();
        c.admission.audio_cooldown_secs = MAX_ADMISSION_SECS;
        c.admission.window_secs = MAX_ADMISSION_SECS;
        c.validate().unwrap();
    }

    #[test]
    fn invalid_file_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[transport]\nmax_attempts = 0\n").unwrap();
        assert!(Config::load_or_init_at(&path).is_err());
    }

    // ── Env overrides ────────────────────────────────────────

    #[test]
    fn overrides_apply_and_fall_back_to_openai_key() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("OPENAI_API_KEY", "sk-fallback"),
            ("TONEGATE_MODEL", "gpt-4"),
            ("TONEGATE_DAILY_LIMIT", "7"),
            ("TONEGATE_STATE_DB", "/tmp/tonegate.db"),
        ]);
        let mut c = Config::default();
        c.apply_overrides_from(|name| vars.get(name).map(ToString::to_string));
        assert_eq!(c.api_key.as_deref(), Some("sk-fallback"));
        assert_eq!(c.model, "gpt-4");
        assert_eq!(c.admission.text_daily_limit, 7);
        assert_eq!(c.admission.audio_daily_limit, 7);
        assert_eq!(c.storage.state_db_path(), PathBuf::from("/tmp/tonegate.db"));
    }

    #[test]
    fn blank_and_unparsable_overrides_are_ignored() {
        let vars: HashMap<&str, &str> =
            HashMap::from([("TONEGATE_API_KEY", "  "), ("TONEGATE_DAILY_LIMIT", "lots")]);
        let mut c = Config::default();
        c.apply_overrides_from(|name| vars.get(name).map(ToString::to_string));
        assert!(c.api_key.is_none());
        assert_eq!(c.admission.text_daily_limit, 100);
    }

    #[test]
    fn env_api_key_overrides_config() {
        let _guard = env_lock();
        // SAFETY: ENV_LOCK serializes environment mutation within this module.
        unsafe {
            std::env::set_var("TONEGATE_API_KEY", "sk-test-env-key");
        }
        let mut c = Config::default();
        c.apply_env_overrides();
        assert_eq!(c.api_key.as_deref(), Some("sk-test-env-key"));
        unsafe {
            std::env::remove_var("TONEGATE_API_KEY");
        }
    }
}
