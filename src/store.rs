use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

const SESSION_FILE: &str = "session.json";
const URGENT_FILE: &str = "urgent.json";
const SCHEMA_VERSION: u32 = 1;

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Json(serde_json::Error),
    EmptyField(&'static str),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Io(err) => write!(f, "io error: {err}"),
            StoreError::Json(err) => write!(f, "json error: {err}"),
            StoreError::EmptyField(field) => write!(f, "empty field: {field}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        StoreError::Io(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        StoreError::Json(value)
    }
}

/// The authenticated identity of the current user. Either both fields are
/// present (authenticated) or the session does not exist (anonymous); no
/// partial state is representable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
struct SessionFile {
    schema_version: u32,
    user_id: String,
    token: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
struct UrgentFile {
    schema_version: u32,
    ids: Vec<String>,
}

fn load_json<T: DeserializeOwned>(path: PathBuf) -> Result<T, StoreError> {
    let mut file = File::open(path)?;
    let mut buf = String::new();
    file.read_to_string(&mut buf)?;
    Ok(serde_json::from_str(&buf)?)
}

fn write_atomic<T: Serialize>(path: PathBuf, data: &T) -> Result<(), StoreError> {
    let temp_path = path.with_extension("tmp");
    let json = serde_json::to_vec_pretty(data)?;
    {
        let mut file = File::create(&temp_path)?;
        file.write_all(&json)?;
        file.sync_all()?;
    }
    fs::rename(temp_path, path)?;
    Ok(())
}

/// Persisted session credentials. Survives process restarts for the lifetime
/// of the profile directory, until explicitly cleared (logout or a 401 from
/// the remote service). Reads the backing file fresh on every call.
#[derive(Clone)]
pub struct SessionStore {
    root: PathBuf,
}

impl SessionStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn ensure_dirs(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    /// Persists both credentials. An empty or whitespace-only value is a
    /// caller error; nothing is written in that case.
    pub fn establish(&self, user_id: &str, token: &str) -> Result<(), StoreError> {
        let user_id = user_id.trim();
        let token = token.trim();
        if user_id.is_empty() {
            return Err(StoreError::EmptyField("user_id"));
        }
        if token.is_empty() {
            return Err(StoreError::EmptyField("token"));
        }
        self.ensure_dirs()?;
        write_atomic(
            self.root.join(SESSION_FILE),
            &SessionFile {
                schema_version: SCHEMA_VERSION,
                user_id: user_id.to_string(),
                token: token.to_string(),
            },
        )
    }

    /// Removes the session unconditionally. Idempotent.
    pub fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(self.root.join(SESSION_FILE)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Returns the stored session, or `None` for anonymous. A file with
    /// either field missing or empty counts as anonymous; a partial session
    /// is never valid.
    pub fn current(&self) -> Option<Session> {
        let file: SessionFile = load_json(self.root.join(SESSION_FILE)).ok()?;
        let user_id = file.user_id.trim();
        let token = file.token.trim();
        if user_id.is_empty() || token.is_empty() {
            return None;
        }
        Some(Session {
            user_id: user_id.to_string(),
            token: token.to_string(),
        })
    }
}

/// Persisted set of task ids the user flagged urgent, consulted when the
/// server record omits the urgency field. Every operation re-reads the
/// backing file so interleaved mutations in one session never act on a
/// stale snapshot.
#[derive(Clone)]
pub struct UrgencyOverlay {
    root: PathBuf,
}

impl UrgencyOverlay {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.read_ids().iter().any(|entry| entry == id)
    }

    /// Inserts the id if absent. Idempotent.
    pub fn add(&self, id: &str) -> Result<(), StoreError> {
        let mut ids = self.read_ids();
        if ids.iter().any(|entry| entry == id) {
            return Ok(());
        }
        ids.push(id.to_string());
        self.write_ids(ids)
    }

    /// Deletes the id if present. Idempotent.
    pub fn remove(&self, id: &str) -> Result<(), StoreError> {
        let mut ids = self.read_ids();
        let before = ids.len();
        ids.retain(|entry| entry != id);
        if ids.len() == before {
            return Ok(());
        }
        self.write_ids(ids)
    }

    fn read_ids(&self) -> Vec<String> {
        // A missing or unreadable file is the empty set; the overlay is a
        // best-effort fallback, never a load blocker.
        match load_json::<UrgentFile>(self.root.join(URGENT_FILE)) {
            Ok(file) => file.ids,
            Err(StoreError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => {
                log::warn!("urgent overlay unreadable, treating as empty: {err}");
                Vec::new()
            }
        }
    }

    fn write_ids(&self, ids: Vec<String>) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root)?;
        write_atomic(
            self.root.join(URGENT_FILE),
            &UrgentFile {
                schema_version: SCHEMA_VERSION,
                ids,
            },
        )
    }
}
