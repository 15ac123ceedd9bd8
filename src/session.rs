use std::{
    fs,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::models::{Role, User};

/// Name of the storage key that holds the signed-in user.
pub const SESSION_KEY: &str = "currentUser";

/// SessionRecord
///
/// The locally cached representation of the signed-in user. Its presence in the
/// session slot is the only signal of "logged in".
///
/// The record is neither signed nor re-validated against the backend: whatever
/// was last written to the slot is trusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SessionRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl SessionRecord {
    /// An absent `isActive` flag means the account is active.
    pub fn is_active(&self) -> bool {
        self.is_active.unwrap_or(true)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<&User> for SessionRecord {
    fn from(user: &User) -> Self {
        SessionRecord {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            is_active: user.is_active,
            avatar: user.avatar.clone(),
        }
    }
}

/// Decodes a stored payload. Anything that is not a valid record reads as "no session".
fn decode_record(raw: &str) -> Option<SessionRecord> {
    match serde_json::from_str::<SessionRecord>(raw) {
        Ok(record) => Some(record),
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring malformed session payload");
            None
        }
    }
}

// 1. SessionStore Contract
/// SessionStore
///
/// A single slot holding zero or one [`SessionRecord`]. The store is owned by
/// the application state and injected wherever the session is needed; only the
/// account flows (login, register, profile update, logout) write to it.
///
/// All operations are synchronous and infallible from the caller's point of
/// view. Storage failures on write are logged, never propagated.
pub trait SessionStore: Send + Sync {
    /// Returns the current record, or `None` when the slot is empty or its
    /// content cannot be decoded.
    fn get(&self) -> Option<SessionRecord>;

    /// Overwrites the slot with `record`.
    fn set(&self, record: &SessionRecord);

    /// Empties the slot. Clearing an empty slot is not an error.
    fn clear(&self);
}

/// SessionState
///
/// The concrete type used to share the session slot across the application state.
pub type SessionState = Arc<dyn SessionStore>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panic while holding the lock leaves the slot text intact; keep using it.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// 2. The Persistent Implementation
/// FileSessionStore
///
/// Persists the slot in a JSON object file used as a small key-value storage
/// area. The record lives under [`SESSION_KEY`]; unrelated keys already present
/// in the file are left untouched. A missing file is an empty store.
pub struct FileSessionStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the whole storage area. Unreadable or non-object content yields an
    /// empty map so that a corrupt file never blocks the application.
    fn read_area(&self) -> Map<String, Value> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Map::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Session file unreadable");
                return Map::new();
            }
        };

        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => {
                tracing::warn!(path = %self.path.display(), "Session file is not a JSON object");
                Map::new()
            }
        }
    }

    fn write_area(&self, area: &Map<String, Value>) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_string_pretty(area).map_err(io::Error::other)?;

        // Write next to the target and rename, so readers never see a half-written file.
        let mut tmp_name = self.path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".tmp");
        let tmp = self.path.with_file_name(tmp_name);
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &self.path)
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self) -> Option<SessionRecord> {
        let _guard = lock(&self.guard);
        match self.read_area().get(SESSION_KEY)? {
            // Values are stored as serialized text, like a browser storage area.
            Value::String(raw) => decode_record(raw),
            other => decode_record(&other.to_string()),
        }
    }

    fn set(&self, record: &SessionRecord) {
        let _guard = lock(&self.guard);
        let raw = match serde_json::to_string(record) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize session record");
                return;
            }
        };
        let mut area = self.read_area();
        area.insert(SESSION_KEY.to_string(), Value::String(raw));
        if let Err(e) = self.write_area(&area) {
            tracing::error!(path = %self.path.display(), error = %e, "Failed to persist session");
        }
    }

    fn clear(&self) {
        let _guard = lock(&self.guard);
        let mut area = self.read_area();
        if area.remove(SESSION_KEY).is_none() {
            return;
        }
        if let Err(e) = self.write_area(&area) {
            tracing::error!(path = %self.path.display(), error = %e, "Failed to clear session");
        }
    }
}

// 3. The In-Memory Implementation
/// MemorySessionStore
///
/// Keeps the serialized record in process memory. Used by tests and by local
/// runs without a configured session file; nothing survives a restart.
#[derive(Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with an already signed-in user.
    pub fn with_record(record: &SessionRecord) -> Self {
        let store = Self::new();
        store.set(record);
        store
    }

    /// Starts with arbitrary slot content, which need not be a valid record.
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(raw.into())),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self) -> Option<SessionRecord> {
        lock(&self.slot).as_deref().and_then(decode_record)
    }

    fn set(&self, record: &SessionRecord) {
        match serde_json::to_string(record) {
            Ok(raw) => *lock(&self.slot) = Some(raw),
            Err(e) => tracing::error!(error = %e, "Failed to serialize session record"),
        }
    }

    fn clear(&self) {
        lock(&self.slot).take();
    }
}
