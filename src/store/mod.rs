//! Durable key-value state scoped to one client profile.
//!
//! Quota windows, cooldown deadlines and the client identity all live here so
//! they survive a restart. Values are JSON strings.

mod memory;
mod sqlite;

pub use memory::MemoryStateStore;
pub use sqlite::SqliteStateStore;

use crate::error::StoreError;
use serde::Serialize;
use serde::de::DeserializeOwned;

pub trait StateStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;

    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Atomically read-modify-write `key`.
    ///
    /// `apply` sees the current value and returns the replacement (`None`
    /// deletes the key). No other writer can interleave between the read and
    /// the write.
    fn update(
        &self,
        key: &str,
        apply: &mut dyn FnMut(Option<&str>) -> Option<String>,
    ) -> Result<(), StoreError>;
}

/// Read and decode a JSON value. Undecodable values read as absent.
pub fn get_json<T: DeserializeOwned>(
    store: &dyn StateStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    Ok(store.get(key)?.and_then(|raw| decode(key, &raw)))
}

pub fn put_json<T: Serialize>(store: &dyn StateStore, key: &str, value: &T) -> Result<(), StoreError> {
    let raw = encode(key, value)?;
    store.put(key, &raw)
}

/// Atomic typed read-modify-write.
///
/// `apply` receives the decoded current value and returns the value to store
/// together with a result that is handed back to the caller.
pub fn update_json<T, R>(
    store: &dyn StateStore,
    key: &str,
    mut apply: impl FnMut(Option<T>) -> (Option<T>, R),
) -> Result<R, StoreError>
where
    T: Serialize + DeserializeOwned,
{
    let mut outcome = None;
    let mut encode_error = None;
    store.update(key, &mut |current| {
        let decoded = current.and_then(|raw| decode::<T>(key, raw));
        let (next, result) = apply(decoded);
        outcome = Some(result);
        match next.map(|value| encode(key, &value)).transpose() {
            Ok(raw) => raw,
            Err(error) => {
                encode_error = Some(error);
                current.map(str::to_string)
            }
        }
    })?;

    if let Some(error) = encode_error {
        return Err(error);
    }
    outcome.ok_or_else(|| StoreError::Corrupt {
        key: key.to_string(),
        message: "update closure was not invoked".into(),
    })
}

fn decode<T: DeserializeOwned>(key: &str, raw: &str) -> Option<T> {
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(error) => {
            tracing::warn!(key, "Discarding undecodable state value: {error}");
            None
        }
    }
}

fn encode<T: Serialize>(key: &str, value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|error| StoreError::Corrupt {
        key: key.to_string(),
        message: error.to_string(),
    })
}
