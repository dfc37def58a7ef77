//! Parley Auth - Identity, session, and authorization core
//!
//! This crate implements the client-side security core of the Parley chat
//! application:
//!
//! - Auth mode negotiation with the backend config endpoint
//! - A login state machine covering implicit, credential, and SSO flows
//! - A persisted session store whose cached token is re-verified before trust
//! - A maintenance gate restricting non-root access
//! - A pure, role-scoped authorization engine over groups and conversations
//! - Bulk session revocation
//!
//! ## Architecture
//!
//! The backend is consumed through the [`backend::AuthBackend`] trait; the
//! rest of the application only sees [`orchestrator::LoginOrchestrator`] and
//! the [`scope`] module. All client-side checks are defensive — the backend
//! remains the final authority and every mutation response is re-validated
//! before being applied to local state.

pub mod backend;
pub mod gate;
pub mod orchestrator;
pub mod resolver;
pub mod revocation;
pub mod scope;
pub mod session;

pub use backend::{AuthBackend, LoginResponse};
pub use gate::{GateDecision, MaintenanceGate};
pub use orchestrator::{AuthPhase, LoginOrchestrator};
pub use resolver::ModeResolver;
pub use revocation::RevocationController;
pub use scope::{Conversation, Directory, Group, ScopeActions, ScopeEngine};
pub use session::{Session, SessionStorage, SessionStore};

/// Authorization-core error taxonomy
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The config endpoint could not be reached or parsed; fatal for boot.
    /// Never silently defaults to mode `none`.
    #[error("Auth configuration unavailable: {message}")]
    ConfigUnavailable { message: String },

    /// Wrong email or password; the user may retry
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Too many failed attempts; the account is locked out
    #[error("Account locked")]
    AccountLocked,

    /// SSO trust assertion rejected; fatal, no client-side retry path
    #[error("SSO verification failed: {message}")]
    SsoVerificationFailed { message: String },

    /// Maintenance mode is on and the identity is not root
    #[error("System is under maintenance")]
    UnderMaintenance,

    /// Authorization scope violation on a mutation
    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    /// Referenced group or conversation vanished; a normal, reportable failure
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// Token invalid or revoked; forces transition back to Unauthenticated
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Core error: {0}")]
    Core(#[from] parley_core::ParleyError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

pub type AuthResult<T> = Result<T, AuthError>;

impl AuthError {
    /// Create a config-unavailable error
    pub fn config_unavailable<S: Into<String>>(message: S) -> Self {
        Self::ConfigUnavailable {
            message: message.into(),
        }
    }

    /// Create an SSO verification error
    pub fn sso_failed<S: Into<String>>(message: S) -> Self {
        Self::SsoVerificationFailed {
            message: message.into(),
        }
    }

    /// Create a forbidden error
    pub fn forbidden<S: Into<String>>(message: S) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network {
            message: message.into(),
            source: None,
        }
    }

    /// Create a network error with source
    pub fn network_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Network {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether the user can recover by retrying or re-prompting.
    ///
    /// `UnderMaintenance` is recoverable only by switching to a root identity;
    /// `SsoVerificationFailed` and `ConfigUnavailable` are fatal client-side.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidCredentials
                | AuthError::AccountLocked
                | AuthError::UnderMaintenance
                | AuthError::Network { .. }
        )
    }
}
