//! Session Storage - Persistence layer for the session cache
//!
//! Saves the active session as a JSON file so a reload does not force
//! re-login. What is read back is a cache, never a source of truth.

use super::Session;
use crate::{AuthError, AuthResult};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const SESSION_FILE: &str = "session.json";

/// File-backed session persistence
pub struct SessionStorage {
    /// Base directory for persisted client state
    storage_dir: PathBuf,
}

impl SessionStorage {
    /// Create a new session storage manager
    pub fn new<P: AsRef<Path>>(storage_dir: P) -> AuthResult<Self> {
        let storage_dir = storage_dir.as_ref().to_path_buf();

        std::fs::create_dir_all(&storage_dir).map_err(AuthError::Io)?;

        info!("Session storage initialized at: {}", storage_dir.display());

        Ok(Self { storage_dir })
    }

    fn session_file(&self) -> PathBuf {
        self.storage_dir.join(SESSION_FILE)
    }

    /// Save the session to disk
    pub fn save(&self, session: &Session) -> AuthResult<()> {
        let json_data =
            serde_json::to_string_pretty(session).map_err(AuthError::Serialization)?;

        std::fs::write(self.session_file(), json_data).map_err(AuthError::Io)?;

        debug!(
            user_id = %session.identity.id,
            "Persisted session to {}",
            self.session_file().display()
        );
        Ok(())
    }

    /// Load the persisted session, if any. The returned token is untrusted
    /// until re-verified against the backend.
    pub fn load(&self) -> AuthResult<Option<Session>> {
        let session_file = self.session_file();

        if !session_file.exists() {
            return Ok(None);
        }

        let json_data = std::fs::read_to_string(&session_file).map_err(AuthError::Io)?;

        match serde_json::from_str::<Session>(&json_data) {
            Ok(session) => {
                debug!("Loaded persisted session from {}", session_file.display());
                Ok(Some(session))
            }
            Err(e) => {
                // A corrupt cache is not fatal; discard it
                warn!("Discarding unreadable session file: {}", e);
                let _ = std::fs::remove_file(&session_file);
                Ok(None)
            }
        }
    }

    /// Delete the persisted session
    pub fn delete(&self) -> AuthResult<()> {
        let session_file = self.session_file();
        if session_file.exists() {
            std::fs::remove_file(&session_file).map_err(AuthError::Io)?;
            debug!("Deleted session file: {}", session_file.display());
        }
        Ok(())
    }
}
