//! Process-wide holder of the current session.
//!
//! The store is the only writer of the persisted session. Every operation is
//! total: persistence failures are logged and the in-memory state still
//! changes, so a broken disk can never keep a user signed in after logout.

use crate::models::Session;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

/// Durable backing for the credential store.
pub trait SessionStorage: Send + Sync {
    fn load(&self) -> io::Result<Option<Session>>;
    fn save(&self, session: &Session) -> io::Result<()>;
    fn clear(&self) -> io::Result<()>;
}

/// Session persisted as pretty JSON in a single file.
#[derive(Debug, Clone)]
pub struct FileSessionStorage {
    path: PathBuf,
}

impl FileSessionStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStorage for FileSessionStorage {
    fn load(&self) -> io::Result<Option<Session>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    fn save(&self, session: &Session) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_vec_pretty(session)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        std::fs::write(&self.path, json)
    }

    fn clear(&self) -> io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// Session kept in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    session: Mutex<Option<Session>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            session: Mutex::new(Some(session)),
        }
    }
}

fn poisoned() -> io::Error {
    io::Error::other("session storage lock poisoned")
}

impl SessionStorage for MemorySessionStorage {
    fn load(&self) -> io::Result<Option<Session>> {
        Ok(self.session.lock().map_err(|_| poisoned())?.clone())
    }

    fn save(&self, session: &Session) -> io::Result<()> {
        *self.session.lock().map_err(|_| poisoned())? = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        *self.session.lock().map_err(|_| poisoned())? = None;
        Ok(())
    }
}

pub struct CredentialStore {
    storage: Arc<dyn SessionStorage>,
    current: RwLock<Option<Session>>,
}

impl CredentialStore {
    /// Store backed by `storage`, starting from whatever it holds.
    pub fn load(storage: Arc<dyn SessionStorage>) -> Self {
        let current = match storage.load() {
            Ok(session) => {
                if session.is_some() {
                    tracing::info!("Restored persisted session");
                }
                session
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read persisted session, starting signed out");
                None
            }
        };

        Self {
            storage,
            current: RwLock::new(current),
        }
    }

    pub fn in_memory() -> Self {
        Self::load(Arc::new(MemorySessionStorage::new()))
    }

    pub async fn get(&self) -> Option<Session> {
        self.current.read().await.clone()
    }

    /// Bearer token of the current session, if any.
    pub async fn token(&self) -> Option<String> {
        self.current
            .read()
            .await
            .as_ref()
            .filter(|session| session.has_token())
            .map(|session| session.token.clone())
    }

    pub async fn has_token(&self) -> bool {
        self.token().await.is_some()
    }

    /// Run a storage operation on the blocking pool. Callers hold the write
    /// guard across it so persisted writes land in the same order.
    async fn persist<F>(&self, op: F) -> io::Result<()>
    where
        F: FnOnce(&dyn SessionStorage) -> io::Result<()> + Send + 'static,
    {
        let storage = self.storage.clone();
        tokio::task::spawn_blocking(move || op(storage.as_ref()))
            .await
            .unwrap_or_else(|e| Err(io::Error::other(e)))
    }

    pub async fn set(&self, session: Session) {
        let mut current = self.current.write().await;
        let persisted = session.clone();
        if let Err(e) = self.persist(move |storage| storage.save(&persisted)).await {
            tracing::warn!(error = %e, "Failed to persist session");
        }
        *current = Some(session);
    }

    /// Drop the session, returning the one that was held.
    pub async fn clear(&self) -> Option<Session> {
        let mut current = self.current.write().await;
        if let Err(e) = self.persist(|storage| storage.clear()).await {
            tracing::warn!(error = %e, "Failed to remove persisted session");
        }
        current.take()
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[tokio::test]
    async fn test_set_get_clear() {
        let store = CredentialStore::in_memory();
        assert!(store.get().await.is_none());

        store.set(Session::new("tok", "/login")).await;
        assert_eq!(store.token().await.as_deref(), Some("tok"));

        let cleared = store.clear().await;
        assert_eq!(cleared.map(|s| s.token), Some("tok".to_string()));
        assert!(!store.has_token().await);
    }

    #[tokio::test]
    async fn test_empty_token_counts_as_absent() {
        let store = CredentialStore::in_memory();
        store.set(Session::new("", "/login")).await;
        assert!(!store.has_token().await);
    }

    #[tokio::test]
    async fn test_file_storage_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let store = CredentialStore::load(Arc::new(FileSessionStorage::new(&path)));
        store
            .set(Session::new("tok", "/login").with_refresh_token(Some("ref".to_string())))
            .await;
        assert!(path.exists());

        let restored = CredentialStore::load(Arc::new(FileSessionStorage::new(&path)));
        let session = restored.get().await.unwrap();
        assert_eq!(session.refresh_token.as_deref(), Some("ref"));

        restored.clear().await;
        assert!(!path.exists());
    }

    struct SlowStorage;

    impl SessionStorage for SlowStorage {
        fn load(&self) -> io::Result<Option<Session>> {
            Ok(None)
        }

        fn save(&self, _session: &Session) -> io::Result<()> {
            std::thread::sleep(Duration::from_millis(100));
            Ok(())
        }

        fn clear(&self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_slow_storage_does_not_stall_runtime() {
        let store = CredentialStore::load(Arc::new(SlowStorage));
        let ticker = tokio::spawn(async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Instant::now()
        });

        store.set(Session::new("tok", "/login")).await;
        let stored_at = Instant::now();

        assert!(ticker.await.unwrap() < stored_at);
        assert!(store.has_token().await);
    }

    #[tokio::test]
    async fn test_corrupt_file_starts_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, b"not json").unwrap();

        let store = CredentialStore::load(Arc::new(FileSessionStorage::new(&path)));
        assert!(store.get().await.is_none());
    }
}
