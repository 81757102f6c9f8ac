//! Stable, best-effort client identity used to partition quotas.

use crate::error::StoreError;
use crate::store::{self, StateStore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

const CLIENT_ID_KEY: &str = "client_id";

/// Environment signals the fingerprint is derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientAttributes {
    pub user_agent: String,
    pub screen: String,
    pub timezone: String,
    pub language: String,
}

impl ClientAttributes {
    /// Collect attributes from the local machine.
    ///
    /// Missing signals fall back to fixed placeholders so the fingerprint is
    /// still stable on the same host.
    pub fn detect() -> Self {
        let host = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "unknown-host".into());
        let offset_minutes = chrono::Local::now().offset().local_minus_utc() / 60;
        let language = ["LC_ALL", "LANG", "LANGUAGE"]
            .iter()
            .find_map(|var| std::env::var(var).ok().filter(|v| !v.is_empty()))
            .unwrap_or_else(|| "en".into());

        Self {
            user_agent: format!(
                "tonegate/{} ({}; {})",
                env!("CARGO_PKG_VERSION"),
                std::env::consts::OS,
                std::env::consts::ARCH
            ),
            screen: host,
            timezone: offset_minutes.to_string(),
            language,
        }
    }

    fn fingerprint(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.user_agent, self.screen, self.timezone, self.language
        )
    }
}

/// Opaque quota partition key. Collisions are tolerated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    pub fn from_attributes(attributes: &ClientAttributes) -> Self {
        let digest = Sha256::digest(attributes.fingerprint().as_bytes());
        Self(hex::encode(digest))
    }

    /// Return the persisted identity, deriving and storing one on first use.
    ///
    /// Once stored, the identity no longer follows attribute changes.
    pub fn resolve(
        store: &dyn StateStore,
        attributes: &ClientAttributes,
    ) -> Result<Self, StoreError> {
        if let Some(existing) = store::get_json::<Self>(store, CLIENT_ID_KEY)? {
            return Ok(existing);
        }
        let derived = Self::from_attributes(attributes);
        store::put_json(store, CLIENT_ID_KEY, &derived)?;
        tracing::info!(client = %derived, "Registered new client identity");
        Ok(derived)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientIdentity {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
