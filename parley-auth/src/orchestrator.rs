//! Login Orchestrator
//!
//! Drives the mode-specific login flow and owns every transition of the
//! session state machine:
//!
//! ```text
//! Unauthenticated -> Authenticating -> Authenticated
//!                 -> Verifying      -> Authenticated | Unauthenticated
//! Failed (re-entrant to Unauthenticated)
//! ```
//!
//! Every transition into `Authenticated` writes the session atomically into
//! the store and passes the maintenance gate first.

use crate::backend::AuthBackend;
use crate::gate::MaintenanceGate;
use crate::resolver::ModeResolver;
use crate::session::{Session, SessionStore};
use crate::{AuthError, AuthResult};
use parley_core::{AuthMode, Identity, Role, ServerConfig};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Observable state of the login state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    Unauthenticated,
    Authenticating,
    /// Re-validating a persisted token against the backend
    Verifying,
    Authenticated,
    Failed,
}

pub struct LoginOrchestrator {
    backend: Arc<dyn AuthBackend>,
    resolver: ModeResolver,
    store: SessionStore,
    phase: RwLock<AuthPhase>,
    /// Set when a root identity is let through under maintenance; a
    /// UI-visible fact, never silently swallowed
    maintenance_banner: RwLock<bool>,
}

impl LoginOrchestrator {
    pub fn new(backend: Arc<dyn AuthBackend>, store: SessionStore) -> Self {
        Self {
            resolver: ModeResolver::new(backend.clone()),
            backend,
            store,
            phase: RwLock::new(AuthPhase::Unauthenticated),
            maintenance_banner: RwLock::new(false),
        }
    }

    /// Boot-time flow: resolve the auth configuration, try to resume a
    /// persisted session, then run the mode-specific login where possible.
    ///
    /// Mode `local` stops at `Unauthenticated` awaiting credentials; modes
    /// `none` and `sso` authenticate without user input.
    pub async fn boot(&self) -> AuthResult<AuthPhase> {
        let config = self.resolver.resolve().await?;

        // Resume: the persisted token is untrusted input until the backend
        // vouches for it
        if let Some(persisted) = self.store.load_persisted() {
            self.set_phase(AuthPhase::Verifying).await;
            match self.backend.verify_token(&persisted.token).await {
                Ok(identity) => {
                    info!(user_id = %identity.id, "Resumed persisted session");
                    self.adopt_session(persisted.token, identity, persisted.mode, config)
                        .await?;
                    return Ok(AuthPhase::Authenticated);
                }
                Err(AuthError::Unauthorized) => {
                    debug!("Persisted session rejected by backend; discarding");
                    self.store.clear().await?;
                    self.set_phase(AuthPhase::Unauthenticated).await;
                }
                Err(e) => {
                    self.set_phase(AuthPhase::Unauthenticated).await;
                    return Err(e);
                }
            }
        }

        match config.mode {
            AuthMode::None => {
                self.set_phase(AuthPhase::Authenticating).await;
                let response = self.backend.implicit_login().await.map_err(|e| {
                    warn!(error = %e, "Implicit login failed");
                    e
                })?;
                self.adopt_session(response.token, response.identity, AuthMode::None, config)
                    .await?;
                Ok(AuthPhase::Authenticated)
            }
            AuthMode::Sso => {
                self.set_phase(AuthPhase::Authenticating).await;
                match self.backend.verify_sso().await {
                    Ok(response) => {
                        self.adopt_session(response.token, response.identity, AuthMode::Sso, config)
                            .await?;
                        Ok(AuthPhase::Authenticated)
                    }
                    Err(e) => {
                        // The trust assertion cannot be edited client-side;
                        // this is terminal for the boot
                        self.set_phase(AuthPhase::Failed).await;
                        Err(e)
                    }
                }
            }
            AuthMode::Local => {
                self.set_phase(AuthPhase::Unauthenticated).await;
                Ok(AuthPhase::Unauthenticated)
            }
        }
    }

    /// Credential login for mode `local`
    pub async fn login(&self, email: &str, password: &str) -> AuthResult<Identity> {
        let config = self.resolver.resolve().await?;
        if config.mode != AuthMode::Local {
            return Err(AuthError::forbidden(format!(
                "Credential login is not available in {} mode",
                config.mode
            )));
        }

        self.set_phase(AuthPhase::Authenticating).await;
        match self.backend.login(email, password).await {
            Ok(response) => {
                let identity = response.identity.clone();
                self.adopt_session(response.token, response.identity, AuthMode::Local, config)
                    .await?;
                info!(user_id = %identity.id, role = %identity.role, "Login succeeded");
                Ok(identity)
            }
            Err(e) => {
                warn!(error = %e, "Login failed");
                self.set_phase(AuthPhase::Failed).await;
                Err(e)
            }
        }
    }

    /// End the current session: best-effort backend invalidation, then a
    /// full local teardown
    pub async fn logout(&self) -> AuthResult<()> {
        if let Some(session) = self.store.get().await {
            if let Err(e) = self.backend.logout(&session.token).await {
                debug!(error = %e, "Backend logout failed; clearing locally anyway");
            }
        }
        self.teardown().await
    }

    /// React to a forced-logout signal: the current token was revoked or
    /// superseded. The token is never retried.
    pub async fn handle_unauthorized(&self) -> AuthResult<()> {
        info!("Session no longer valid; forcing logout");
        self.teardown().await
    }

    /// Gate-checked access to the current session for privileged actions.
    /// Fails with `Unauthorized` when no session is active and with
    /// `UnderMaintenance` when the gate denies.
    pub async fn ensure_operational(&self) -> AuthResult<Session> {
        let session = self.store.get().await.ok_or(AuthError::Unauthorized)?;
        let maintenance = self
            .resolver
            .cached()
            .await
            .map(|c| c.maintenance_mode)
            .unwrap_or(false);
        MaintenanceGate::check(session.identity.role, maintenance)?;
        Ok(session)
    }

    pub async fn phase(&self) -> AuthPhase {
        *self.phase.read().await
    }

    pub async fn current_session(&self) -> Option<Session> {
        self.store.get().await
    }

    pub async fn current_identity(&self) -> Option<Identity> {
        self.store.get().await.map(|s| s.identity)
    }

    pub async fn current_role(&self) -> Option<Role> {
        self.store.get().await.map(|s| s.identity.role)
    }

    pub async fn is_authenticated(&self) -> bool {
        self.phase().await == AuthPhase::Authenticated
    }

    /// Whether the maintenance banner must be surfaced (root under
    /// maintenance)
    pub async fn is_under_maintenance(&self) -> bool {
        *self.maintenance_banner.read().await
    }

    /// The resolved server configuration, if boot has fetched it
    pub async fn server_config(&self) -> Option<ServerConfig> {
        self.resolver.cached().await
    }

    pub fn backend(&self) -> Arc<dyn AuthBackend> {
        self.backend.clone()
    }

    async fn set_phase(&self, phase: AuthPhase) {
        let mut guard = self.phase.write().await;
        if *guard != phase {
            debug!(from = ?*guard, to = ?phase, "Auth phase transition");
            *guard = phase;
        }
    }

    /// Pass the maintenance gate, then atomically commit the session.
    /// A gate denial drops the just-issued token so no unusable session
    /// lingers on either side.
    async fn adopt_session(
        &self,
        token: String,
        identity: Identity,
        mode: AuthMode,
        config: ServerConfig,
    ) -> AuthResult<()> {
        let banner = match MaintenanceGate::check(identity.role, config.maintenance_mode) {
            Ok(banner) => banner,
            Err(e) => {
                warn!(user_id = %identity.id, "Authenticated but blocked by maintenance gate");
                if let Err(logout_err) = self.backend.logout(&token).await {
                    debug!(error = %logout_err, "Failed to release blocked session token");
                }
                self.store.clear().await?;
                self.set_phase(AuthPhase::Unauthenticated).await;
                return Err(e);
            }
        };

        *self.maintenance_banner.write().await = banner;
        self.store.set(Session::new(token, identity, mode)).await?;
        self.set_phase(AuthPhase::Authenticated).await;
        Ok(())
    }

    async fn teardown(&self) -> AuthResult<()> {
        self.store.clear().await?;
        *self.maintenance_banner.write().await = false;
        self.set_phase(AuthPhase::Unauthenticated).await;
        Ok(())
    }
}
