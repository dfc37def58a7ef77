//! Session Store - single active session per client instance

use super::{Session, SessionStorage};
use crate::AuthResult;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Process-wide holder of the current session.
///
/// Exactly one session is active at a time; writes are last-writer-wins but
/// only the login orchestrator and revocation handling ever issue them.
/// Writes are atomic: a session is set or cleared as a whole, never a token
/// without its identity.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<Option<Session>>>,
    storage: Option<Arc<SessionStorage>>,
}

impl SessionStore {
    /// Create an in-memory store without persistence
    pub fn ephemeral() -> Self {
        Self {
            inner: Arc::new(RwLock::new(None)),
            storage: None,
        }
    }

    /// Create a store that persists through the given storage
    pub fn persistent(storage: SessionStorage) -> Self {
        Self {
            inner: Arc::new(RwLock::new(None)),
            storage: Some(Arc::new(storage)),
        }
    }

    /// Current session, if any
    pub async fn get(&self) -> Option<Session> {
        self.inner.read().await.clone()
    }

    /// Replace the current session and persist it
    pub async fn set(&self, session: Session) -> AuthResult<()> {
        if let Some(storage) = &self.storage {
            storage.save(&session)?;
        }
        let mut guard = self.inner.write().await;
        *guard = Some(session);
        Ok(())
    }

    /// Drop the current session and its persisted copy
    pub async fn clear(&self) -> AuthResult<()> {
        if let Some(storage) = &self.storage {
            storage.delete()?;
        }
        let mut guard = self.inner.write().await;
        if guard.take().is_some() {
            debug!("Cleared active session");
        }
        Ok(())
    }

    /// Read the persisted session without adopting it. The caller must
    /// verify the token against the backend before trusting it.
    pub fn load_persisted(&self) -> Option<Session> {
        self.storage
            .as_ref()
            .and_then(|storage| storage.load().ok().flatten())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::{AuthMode, Identity, Role};

    fn session(token: &str) -> Session {
        Session::new(
            token.to_string(),
            Identity::new("u-1", Role::User),
            AuthMode::Local,
        )
    }

    #[tokio::test]
    async fn test_set_get_clear() {
        let store = SessionStore::ephemeral();
        assert!(store.get().await.is_none());

        store.set(session("tok-1")).await.unwrap();
        assert_eq!(store.get().await.unwrap().token, "tok-1");

        // Last writer wins
        store.set(session("tok-2")).await.unwrap();
        assert_eq!(store.get().await.unwrap().token, "tok-2");

        store.clear().await.unwrap();
        assert!(store.get().await.is_none());
    }

    #[tokio::test]
    async fn test_persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();

        let store = SessionStore::persistent(SessionStorage::new(dir.path()).unwrap());
        store.set(session("tok-persisted")).await.unwrap();

        // A fresh store over the same directory sees the persisted session
        let reloaded = SessionStore::persistent(SessionStorage::new(dir.path()).unwrap());
        let persisted = reloaded.load_persisted().unwrap();
        assert_eq!(persisted.token, "tok-persisted");

        reloaded.clear().await.unwrap();
        assert!(reloaded.load_persisted().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_persisted_session_discarded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("session.json"), "not json").unwrap();

        let store = SessionStore::persistent(SessionStorage::new(dir.path()).unwrap());
        assert!(store.load_persisted().is_none());
    }
}
