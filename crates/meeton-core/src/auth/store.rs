//! Persistence of the last session blob.
//!
//! The blob is a single serialized [`Credentials`] value under a fixed key. It
//! lets a restart resume the session and still show who was signed in when
//! the backend is unreachable.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use super::{AuthError, AuthResult, Credentials};

pub const SESSION_FILE_NAME: &str = "meeton-session.json";

pub trait SessionPersistence: Send + Sync {
    fn load_session(&self) -> AuthResult<Option<Credentials>>;
    fn save_session(&self, credentials: &Credentials) -> AuthResult<()>;
    fn clear_session(&self) -> AuthResult<()>;
}

/// Stores the session as JSON in `<dir>/meeton-session.json`.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(SESSION_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionPersistence for FileSessionStore {
    fn load_session(&self) -> AuthResult<Option<Credentials>> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(AuthError::Storage(format!(
                "Failed to read {}: {error}",
                self.path.display()
            ))),
        }
    }

    fn save_session(&self, credentials: &Credentials) -> AuthResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                AuthError::Storage(format!("Failed to create {}: {error}", parent.display()))
            })?;
        }
        let serialized = serde_json::to_string(credentials)?;
        std::fs::write(&self.path, serialized).map_err(|error| {
            AuthError::Storage(format!("Failed to write {}: {error}", self.path.display()))
        })
    }

    fn clear_session(&self) -> AuthResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(AuthError::Storage(format!(
                "Failed to remove {}: {error}",
                self.path.display()
            ))),
        }
    }
}

/// Process-local store, for tests and for clients that must not touch disk.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    raw: Mutex<Option<String>>,
}

impl SessionPersistence for MemorySessionStore {
    fn load_session(&self) -> AuthResult<Option<Credentials>> {
        let guard = self.raw.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_deref() {
            Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
            None => Ok(None),
        }
    }

    fn save_session(&self, credentials: &Credentials) -> AuthResult<()> {
        let raw = serde_json::to_string(credentials)?;
        *self.raw.lock().unwrap_or_else(PoisonError::into_inner) = Some(raw);
        Ok(())
    }

    fn clear_session(&self) -> AuthResult<()> {
        *self.raw.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::auth::SessionUser;
    use crate::models::UserId;

    fn credentials() -> Credentials {
        Credentials {
            access_token: "access".to_string(),
            refresh_token: Some("refresh".to_string()),
            expires_at: Some(1_900_000_000),
            user: SessionUser {
                id: UserId::new("u1").unwrap(),
                email: Some("ana@example.com".to_string()),
                display_name: Some("Ana".to_string()),
            },
        }
    }

    #[test]
    fn file_store_roundtrip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::in_dir(dir.path().join("nested"));

        assert_eq!(store.load_session().unwrap(), None);
        store.save_session(&credentials()).unwrap();
        assert_eq!(store.load_session().unwrap(), Some(credentials()));

        store.clear_session().unwrap();
        assert_eq!(store.load_session().unwrap(), None);
        store.clear_session().unwrap();
    }

    #[test]
    fn file_store_reports_corrupt_blob() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::in_dir(dir.path());
        std::fs::write(store.path(), "{not json").unwrap();
        assert!(matches!(store.load_session(), Err(AuthError::Json(_))));
    }

    #[test]
    fn memory_store_roundtrip() {
        let store = MemorySessionStore::default();
        store.save_session(&credentials()).unwrap();
        assert_eq!(store.load_session().unwrap(), Some(credentials()));
        store.clear_session().unwrap();
        assert_eq!(store.load_session().unwrap(), None);
    }
}
