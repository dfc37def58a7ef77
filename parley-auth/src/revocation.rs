//! Session Revocation Controller
//!
//! Root-only kill switch: invalidates every outstanding session system-wide,
//! including the issuing root's own token. After a successful revocation the
//! local session is torn down and the orchestrator is `Unauthenticated`.

use crate::orchestrator::LoginOrchestrator;
use crate::scope::ScopeEngine;
use crate::{AuthError, AuthResult};
use tracing::{info, warn};

pub struct RevocationController;

impl RevocationController {
    /// Revoke every session. Returns the number of sessions invalidated.
    ///
    /// The caller's own token dies with the rest; the orchestrator is left
    /// `Unauthenticated` and a fresh login is required.
    pub async fn revoke_all(orchestrator: &LoginOrchestrator) -> AuthResult<usize> {
        let session = orchestrator.ensure_operational().await?;
        if !ScopeEngine::can_revoke_sessions(&session.identity) {
            return Err(AuthError::forbidden("Only root may revoke all sessions"));
        }

        let affected = orchestrator
            .backend()
            .revoke_all_sessions(&session.token)
            .await
            .map_err(|e| {
                warn!(error = %e, "Revoke-all failed; sessions untouched");
                e
            })?;

        info!(affected, "All sessions revoked, own token included");
        orchestrator.handle_unauthorized().await?;
        Ok(affected)
    }
}
