//! Session persistence: a key-value store behind the orchestrator
//!
//! The engines never see the store. The orchestrator hands out a
//! `SessionSnapshot`; these helpers write it under `sifquiz_session_<id>` and
//! read it back, discarding snapshots past the TTL.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::SNAPSHOT_KEY_PREFIX;
use crate::types::{SessionSnapshot, StoreError};

lazy_static! {
    static ref RE_SESSION_ID: Regex = Regex::new(r"^sess_[0-9a-f]{16}$").unwrap();
}

/// Minimal load/save/remove interface
pub trait SessionStore: std::fmt::Debug {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn save(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// One JSON file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl SessionStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(std::fs::read_to_string(path)?))
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path(key), value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path(key);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl SessionStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// `sess_` + first 8 bytes of SHA-256 over the timestamp, hex
pub fn generate_session_id(created: DateTime<Utc>) -> String {
    let nanos = created.timestamp_nanos_opt().unwrap_or_else(|| created.timestamp_micros());
    let mut hasher = Sha256::new();
    hasher.update(nanos.to_be_bytes());
    let digest = hasher.finalize();
    let hex: String = digest.iter().take(8).map(|b| format!("{:02x}", b)).collect();
    format!("sess_{}", hex)
}

/// Whether `session_id` has the `sess_` + 16 hex digits shape
pub fn is_valid_session_id(session_id: &str) -> bool {
    RE_SESSION_ID.is_match(session_id)
}

/// Store key for a session id; ids of any other shape are rejected
pub fn session_key(session_id: &str) -> Result<String, StoreError> {
    if !is_valid_session_id(session_id) {
        return Err(StoreError::InvalidSessionId(session_id.to_string()));
    }
    Ok(format!("{}{}", SNAPSHOT_KEY_PREFIX, session_id))
}

/// Write a snapshot under its session key; returns the key
pub fn save_session(store: &dyn SessionStore, snapshot: &SessionSnapshot) -> Result<String, StoreError> {
    let key = session_key(&snapshot.session_id)?;
    let json = serde_json::to_string_pretty(snapshot)?;
    store.save(&key, &json)?;
    tracing::debug!(key = %key, phase = %snapshot.phase, "session saved");
    Ok(key)
}

/// Read a snapshot; expired ones are removed and reported as absent
pub fn load_session(
    store: &dyn SessionStore,
    session_id: &str,
    now: DateTime<Utc>,
) -> Result<Option<SessionSnapshot>, StoreError> {
    let key = session_key(session_id)?;
    let Some(json) = store.load(&key)? else {
        return Ok(None);
    };
    let snapshot: SessionSnapshot = serde_json::from_str(&json)?;
    if snapshot.is_expired(now) {
        tracing::warn!(key = %key, last_updated = %snapshot.last_updated, "session snapshot expired, discarding");
        store.remove(&key)?;
        return Ok(None);
    }
    Ok(Some(snapshot))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use crate::types::{PhaseBState, QuizPhase, UsedQuestions};

    const ID_A: &str = "sess_00000000000000aa";
    const ID_OLD: &str = "sess_00000000000000bb";
    const ID_NONE: &str = "sess_00000000000000cc";
    const ID_FILE: &str = "sess_00000000000000dd";
    const ID_BAD: &str = "sess_00000000000000ee";

    fn snapshot(id: &str, last_updated: DateTime<Utc>) -> SessionSnapshot {
        SessionSnapshot {
            session_id: id.to_string(),
            phase: QuizPhase::B,
            used_questions: ["B-Control-CO-1".to_string()].into_iter().collect::<UsedQuestions>(),
            question_history: Vec::new(),
            phase_b_state: Some(PhaseBState::default()),
            phase_c_state: None,
            last_updated,
            anchor: None,
            installed_choice: None,
        }
    }

    #[test]
    fn test_session_id_format() {
        let now = Utc::now();
        let id = generate_session_id(now);
        assert!(id.starts_with("sess_"));
        assert_eq!(id.len(), 5 + 16);
        assert_eq!(id, generate_session_id(now));
        assert_ne!(id, generate_session_id(now + Duration::nanoseconds(1)));
    }

    #[test]
    fn test_memory_roundtrip() {
        let store = MemoryStore::new();
        let snap = snapshot(ID_A, Utc::now());
        let key = save_session(&store, &snap).unwrap();
        assert_eq!(key, format!("sifquiz_session_{}", ID_A));
        let back = load_session(&store, ID_A, Utc::now()).unwrap().unwrap();
        assert_eq!(back, snap);
    }

    #[test]
    fn test_expired_snapshot_is_removed() {
        let store = MemoryStore::new();
        let now = Utc::now();
        save_session(&store, &snapshot(ID_OLD, now - Duration::hours(30))).unwrap();
        assert_eq!(store.len(), 1);
        assert!(load_session(&store, ID_OLD, now).unwrap().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_missing_session_is_none() {
        let store = MemoryStore::new();
        assert!(load_session(&store, ID_NONE, Utc::now()).unwrap().is_none());
    }

    #[test]
    fn test_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("sessions"));
        let snap = snapshot(ID_FILE, Utc::now());
        save_session(&store, &snap).unwrap();
        let key = session_key(ID_FILE).unwrap();
        assert!(dir.path().join(format!("sessions/{}.json", key)).exists());
        assert_eq!(load_session(&store, ID_FILE, Utc::now()).unwrap(), Some(snap));
        store.remove(&key).unwrap();
        assert!(store.load(&key).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_snapshot_is_an_error() {
        let store = MemoryStore::new();
        store.save(&session_key(ID_BAD).unwrap(), "{not json").unwrap();
        assert!(matches!(load_session(&store, ID_BAD, Utc::now()), Err(StoreError::Serialize(_))));
    }

    #[test]
    fn test_session_id_shape_is_enforced() {
        assert!(is_valid_session_id(&generate_session_id(Utc::now())));
        for id in ["", "sess_", "sess_0123", "sess_0123456789ABCDEF", "../sess_0123456789abcdef", "sess_0123456789abcdef/.."] {
            assert!(!is_valid_session_id(id), "{}", id);
        }
    }

    #[test]
    fn test_path_like_id_never_touches_the_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let outside = dir.path().join("victim.json");
        std::fs::write(&outside, "{}").unwrap();
        let store = FileStore::new(dir.path().join("sessions"));

        let err = load_session(&store, "../victim", Utc::now()).unwrap_err();
        assert!(matches!(err, StoreError::InvalidSessionId(ref id) if id == "../victim"));
        assert!(outside.exists());

        let mut snap = snapshot(ID_A, Utc::now());
        snap.session_id = "../victim".to_string();
        assert!(matches!(save_session(&store, &snap), Err(StoreError::InvalidSessionId(_))));
        assert!(!dir.path().join("sessions").exists());
    }
}
