//! Backend contract
//!
//! Abstract interface to the Parley backend. The identity core never talks to
//! the network directly; everything flows through [`AuthBackend`], with an
//! HTTP implementation for production and an in-memory implementation for
//! development and tests.

pub mod http;
pub mod memory;

pub use http::HttpBackend;
pub use memory::MemoryBackend;

use crate::scope::Directory;
use crate::AuthResult;
use async_trait::async_trait;
use parley_core::{Identity, ServerConfig};
use serde::{Deserialize, Serialize};

/// Successful authentication payload: an opaque token plus the identity it
/// was issued for. Always delivered together — never one without the other.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub identity: Identity,
}

/// Abstract backend contract consumed by the identity core.
///
/// All calls are async and may fail with the [`crate::AuthError`] taxonomy;
/// no automatic retries are performed by the core.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Fetch the negotiated auth mode, multi-login policy, and maintenance
    /// flag. Polled once per boot.
    async fn fetch_config(&self) -> AuthResult<ServerConfig>;

    /// Obtain the implicit identity for mode `none` deployments
    async fn implicit_login(&self) -> AuthResult<LoginResponse>;

    /// Credential login for mode `local`
    async fn login(&self, email: &str, password: &str) -> AuthResult<LoginResponse>;

    /// Verify the implicit trust assertion for mode `sso`
    async fn verify_sso(&self) -> AuthResult<LoginResponse>;

    /// Re-validate a (possibly persisted) token. `Unauthorized` means the
    /// token is invalid, revoked, or superseded.
    async fn verify_token(&self, token: &str) -> AuthResult<Identity>;

    /// Invalidate a single session token
    async fn logout(&self, token: &str) -> AuthResult<()>;

    /// Fetch the current user/group/conversation directory snapshot
    async fn fetch_directory(&self, token: &str) -> AuthResult<Directory>;

    /// Create a group (root only)
    async fn create_group(&self, token: &str, name: &str) -> AuthResult<crate::scope::Group>;

    /// Delete a group (root or group owner)
    async fn delete_group(&self, token: &str, group_id: &str) -> AuthResult<()>;

    /// Delegate management of a group to a manager (root only)
    async fn delegate_manager(
        &self,
        token: &str,
        manager_id: &str,
        group_id: &str,
    ) -> AuthResult<()>;

    /// Revoke a manager delegation (root only)
    async fn revoke_delegation(
        &self,
        token: &str,
        manager_id: &str,
        group_id: &str,
    ) -> AuthResult<()>;

    /// Atomically move a conversation to a new home group
    async fn move_conversation(
        &self,
        token: &str,
        conversation_id: &str,
        dest_group_id: &str,
    ) -> AuthResult<crate::scope::Conversation>;

    /// Share a conversation with a group (idempotent; home group untouched)
    async fn share_conversation(
        &self,
        token: &str,
        conversation_id: &str,
        group_id: &str,
    ) -> AuthResult<crate::scope::Conversation>;

    /// Remove a conversation's home group without clearing its shares
    async fn unassign_group(
        &self,
        token: &str,
        conversation_id: &str,
    ) -> AuthResult<crate::scope::Conversation>;

    /// Invalidate every outstanding session system-wide, the caller's
    /// included (root only). Returns the number of revoked sessions.
    async fn revoke_all_sessions(&self, token: &str) -> AuthResult<usize>;
}
