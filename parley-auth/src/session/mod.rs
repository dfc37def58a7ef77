//! Session Module
//!
//! Holds the single active session per client instance and its persistence.
//! A persisted session survives reloads, but the stored token is untrusted
//! input: it must pass a backend verify round trip before being adopted
//! (see [`crate::orchestrator::LoginOrchestrator::boot`]).

pub mod storage;
pub mod store;

pub use storage::SessionStorage;
pub use store::SessionStore;

use chrono::{DateTime, Utc};
use parley_core::{AuthMode, Identity};
use serde::{Deserialize, Serialize};

/// An established session: token and identity always travel together
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Opaque backend-issued token
    pub token: String,
    /// Identity the token was issued for
    pub identity: Identity,
    /// When the session was established
    pub established_at: DateTime<Utc>,
    /// Auth mode the session was established under
    pub mode: AuthMode,
}

impl Session {
    /// Create a session established now
    pub fn new(token: String, identity: Identity, mode: AuthMode) -> Self {
        Self {
            token,
            identity,
            established_at: Utc::now(),
            mode,
        }
    }

    /// Session age in minutes
    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.established_at).num_minutes()
    }
}
