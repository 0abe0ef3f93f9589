//! Persisted "logged-in user name".
//!
//! Presence of a stored name is the whole of authentication here; nothing is verified.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session storage I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("session file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("session store lock poisoned")]
    Poisoned,
}

pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<String>, SessionError>;
    fn save(&self, user: &str) -> Result<(), SessionError>;
    fn clear(&self) -> Result<(), SessionError>;
}

#[derive(Serialize, Deserialize)]
struct StoredSession {
    icrazy_user: String,
}

/// JSON file holding `{"icrazy_user": "<name>"}`.
#[derive(Debug, Clone)]
pub struct FileSessionStore { path: PathBuf }

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<String>, SessionError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice::<StoredSession>(&bytes)?.icrazy_user)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, user: &str) -> Result<(), SessionError> {
        let body = serde_json::to_vec(&StoredSession { icrazy_user: user.to_string() })?;
        fs::write(&self.path, body)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemorySessionStore { user: Mutex<Option<String>> }

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<String>, SessionError> {
        Ok(self.user.lock().map_err(|_| SessionError::Poisoned)?.clone())
    }

    fn save(&self, user: &str) -> Result<(), SessionError> {
        *self.user.lock().map_err(|_| SessionError::Poisoned)? = Some(user.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        *self.user.lock().map_err(|_| SessionError::Poisoned)? = None;
        Ok(())
    }
}
