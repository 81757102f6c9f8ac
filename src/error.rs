use crate::admission::RequestKind;
use crate::session::{InteractionMode, Tone};
use chrono::{DateTime, Utc};
use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `tonegate`.
///
/// Library callers match on these to decide what to render. `Rejected` is the
/// recoverable, user-visible branch; everything else ends in a generic
/// "try again later" banner.
#[derive(Debug, Error)]
pub enum GateError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Persistence ─────────────────────────────────────────────────────
    #[error("store: {0}")]
    Store(#[from] StoreError),

    // ── Transport / Provider ────────────────────────────────────────────
    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    // ── Admission ───────────────────────────────────────────────────────
    #[error(transparent)]
    Rejected(#[from] Rejection),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Store errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("corrupt value under {key}: {message}")]
    Corrupt { key: String, message: String },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Transport errors ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("{backend} throttled the request (retry after {retry_after_secs:?}s)")]
    Throttled {
        backend: String,
        retry_after_secs: Option<u64>,
    },

    #[error("{backend} request timed out after {timeout_secs}s")]
    Timeout { backend: String, timeout_secs: u64 },

    #[error("{backend} returned HTTP {status}: {message}")]
    Http {
        backend: String,
        status: u16,
        message: String,
    },

    #[error("{backend} request failed: {message}")]
    Network { backend: String, message: String },

    #[error("{backend} response could not be decoded: {message}")]
    Decode { backend: String, message: String },

    #[error("API key not set. Set TONEGATE_API_KEY or edit config.toml.")]
    MissingApiKey,

    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        last: Box<TransportError>,
    },
}

impl TransportError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// 4xx client errors are final except 408 (timeout) and 429 (throttled).
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Throttled { .. } | Self::Timeout { .. } | Self::Network { .. } => true,
            Self::Http { status, .. } => {
                !(400..500).contains(status) || *status == 408 || *status == 429
            }
            Self::Decode { .. } | Self::MissingApiKey | Self::Exhausted { .. } => false,
        }
    }

    /// True when the provider signalled throttling, directly or as the last
    /// failure of an exhausted retry run.
    pub fn is_throttled(&self) -> bool {
        match self {
            Self::Throttled { .. } => true,
            Self::Http { status, .. } => *status == 429,
            Self::Exhausted { last, .. } => last.is_throttled(),
            _ => false,
        }
    }
}

// ─── Admission / session rejections ─────────────────────────────────────────

/// Recoverable outcomes rendered to the user as a notice, never as a failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("please wait {seconds_remaining} seconds before the next {kind} request")]
    Cooldown {
        kind: RequestKind,
        seconds_remaining: u64,
    },

    #[error("daily limit of {limit} {kind} requests reached; resets at {reset_at}")]
    QuotaExhausted {
        kind: RequestKind,
        limit: u32,
        reset_at: DateTime<Utc>,
    },

    #[error("you've reached the maximum of {max} tone changes for this analysis")]
    VariantCapReached { max: u32 },

    #[error("input rejected: {0}")]
    InputRejected(String),

    #[error("run an analysis before changing tone")]
    NotReady,

    #[error("the {tone} tone is not available in {mode} mode")]
    ToneUnavailable { tone: Tone, mode: InteractionMode },
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, GateError>;
