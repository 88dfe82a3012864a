//! Durable storage for the session store.
//!
//! The whole session is one named JSON blob:
//!
//! ```text
//! { "schemaVersion": 1,
//!   "state": { "user": {...} | null, "videos": [...], "isAuthenticated": bool } }
//! ```
//!
//! Blobs written before versioning existed carry no `schemaVersion` (they
//! have a `version: 0` envelope field instead, which is ignored). They are read
//! as version 0, whose `state` layout is identical, and upgraded in memory.
//! A version newer than [`SCHEMA_VERSION`] is refused rather than guessed at.

use crate::error::ShortsError;
use crate::model::{User, Video};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Current layout of the persisted blob.
pub const SCHEMA_VERSION: u32 = 1;

/// File name used when no explicit state path is configured.
pub const DEFAULT_STATE_FILE: &str = "auth-storage.json";

/// Everything the session store persists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub videos: Vec<Video>,
    #[serde(default)]
    pub is_authenticated: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeOut<'a> {
    schema_version: u32,
    state: &'a SessionState,
}

#[derive(Deserialize)]
struct EnvelopeIn {
    #[serde(default)]
    state: SessionState,
}

/// Serialise `state` under the current schema version.
pub fn encode(state: &SessionState) -> Result<String, ShortsError> {
    serde_json::to_string_pretty(&EnvelopeOut {
        schema_version: SCHEMA_VERSION,
        state,
    })
    .map_err(|e| ShortsError::Internal(format!("session encode: {e}")))
}

/// Parse a stored blob, upgrading older layouts.
///
/// `location` only feeds error messages.
pub fn decode(blob: &str, location: &str) -> Result<SessionState, ShortsError> {
    let corrupt = |e: serde_json::Error| ShortsError::CorruptState {
        location: location.to_string(),
        detail: e.to_string(),
    };

    let value: serde_json::Value = serde_json::from_str(blob).map_err(corrupt)?;
    let found = match value.get("schemaVersion") {
        None => 0,
        Some(v) => v
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| ShortsError::CorruptState {
                location: location.to_string(),
                detail: format!("schemaVersion is not a version number: {v}"),
            })?,
    };
    if found > SCHEMA_VERSION {
        return Err(ShortsError::UnsupportedSchemaVersion {
            location: location.to_string(),
            found,
            supported: SCHEMA_VERSION,
        });
    }

    let envelope: EnvelopeIn = serde_json::from_value(value).map_err(corrupt)?;
    if found < SCHEMA_VERSION {
        debug!(
            "Upgrading session state at {} from schema {} to {}",
            location, found, SCHEMA_VERSION
        );
    }
    let mut state = envelope.state;
    // An authenticated flag without a profile cannot be acted on.
    if state.user.is_none() {
        state.is_authenticated = false;
    }
    Ok(state)
}

/// Where the session blob lives.
pub trait StateStorage: Send + Sync {
    /// Human-readable location for logs and errors.
    fn location(&self) -> String;

    /// The stored blob, or `None` when nothing was saved yet.
    fn load(&self) -> Result<Option<String>, ShortsError>;

    /// Replace the stored blob.
    fn save(&self, blob: &str) -> Result<(), ShortsError>;
}

/// A blob on disk, replaced atomically on every save.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_failed(&self, source: std::io::Error) -> ShortsError {
        ShortsError::StateWriteFailed {
            location: self.location(),
            source,
        }
    }
}

impl StateStorage for FileStorage {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<Option<String>, ShortsError> {
        match std::fs::read_to_string(&self.path) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ShortsError::StateReadFailed {
                location: self.location(),
                source: e,
            }),
        }
    }

    /// Atomic write: temp file in the same directory, then rename.
    fn save(&self, blob: &str) -> Result<(), ShortsError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| self.write_failed(e))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| self.write_failed(e))?;
        tmp.write_all(blob.as_bytes())
            .map_err(|e| self.write_failed(e))?;
        tmp.as_file().sync_all().map_err(|e| self.write_failed(e))?;
        tmp.persist(&self.path)
            .map_err(|e| self.write_failed(e.error))?;
        Ok(())
    }
}

/// An in-process blob. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    blob: Mutex<Option<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an existing blob.
    pub fn with_blob(blob: impl Into<String>) -> Self {
        Self {
            blob: Mutex::new(Some(blob.into())),
        }
    }

    /// The last saved blob.
    pub fn contents(&self) -> Option<String> {
        self.blob.lock().ok().and_then(|b| b.clone())
    }
}

impl StateStorage for MemoryStorage {
    fn location(&self) -> String {
        "<memory>".to_string()
    }

    fn load(&self) -> Result<Option<String>, ShortsError> {
        Ok(self.contents())
    }

    fn save(&self, blob: &str) -> Result<(), ShortsError> {
        let mut slot = self
            .blob
            .lock()
            .map_err(|_| ShortsError::Internal("memory storage lock poisoned".into()))?;
        *slot = Some(blob.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample_state() -> SessionState {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        SessionState {
            user: Some(User::free_tier("1", "user@example.com", "Demo User", now)),
            videos: vec![],
            is_authenticated: true,
        }
    }

    #[test]
    fn encode_stamps_current_version() {
        let state = sample_state();
        let blob = encode(&state).unwrap();
        let v: serde_json::Value = serde_json::from_str(&blob).unwrap();
        assert_eq!(v["schemaVersion"], SCHEMA_VERSION);
        assert_eq!(v["state"]["isAuthenticated"], true);
        assert_eq!(decode(&blob, "t").unwrap(), state);
    }

    #[test]
    fn legacy_blob_without_version_loads() {
        let blob = r#"{
            "state": {
                "user": null,
                "videos": [{
                    "id": "1700000000000",
                    "title": "New Video",
                    "url": "output_with_subtitles.mp4",
                    "createdAt": "2024-01-05T10:00:00.000Z",
                    "duration": 0
                }],
                "isAuthenticated": false,
                "isLoading": false
            },
            "version": 0
        }"#;
        let state = decode(blob, "legacy").unwrap();
        assert_eq!(state.videos.len(), 1);
        assert_eq!(state.videos[0].title, "New Video");
        assert!(state.user.is_none());
    }

    #[test]
    fn newer_version_is_refused() {
        let blob = r#"{ "schemaVersion": 2, "state": { "somethingNew": true } }"#;
        let err = decode(blob, "future.json").unwrap_err();
        assert!(matches!(
            err,
            ShortsError::UnsupportedSchemaVersion { found: 2, supported: 1, .. }
        ));
    }

    #[test]
    fn garbage_is_corrupt() {
        let err = decode("{not json", "bad.json").unwrap_err();
        assert!(matches!(err, ShortsError::CorruptState { .. }));

        let err = decode(r#"{"schemaVersion": "one"}"#, "bad.json").unwrap_err();
        assert!(matches!(err, ShortsError::CorruptState { .. }));
    }

    #[test]
    fn authenticated_without_user_is_reset() {
        let blob = r#"{ "schemaVersion": 1, "state": { "user": null, "isAuthenticated": true } }"#;
        assert!(!decode(blob, "t").unwrap().is_authenticated);
    }

    #[test]
    fn file_storage_round_trips_and_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("nested").join(DEFAULT_STATE_FILE));

        assert!(storage.load().unwrap().is_none());
        storage.save("{\"a\":1}").unwrap();
        storage.save("{\"a\":2}").unwrap();
        assert_eq!(storage.load().unwrap().as_deref(), Some("{\"a\":2}"));
    }

    #[test]
    fn memory_storage_keeps_last_blob() {
        let storage = MemoryStorage::with_blob("x");
        assert_eq!(storage.load().unwrap().as_deref(), Some("x"));
        storage.save("y").unwrap();
        assert_eq!(storage.contents().as_deref(), Some("y"));
    }
}
