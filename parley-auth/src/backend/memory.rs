//! In-memory reference backend
//!
//! Implements the full backend contract against process-local state, with
//! argon2-hashed credentials. Used for development deployments and as the
//! semantic authority in tests: lockout, multi-login supersession,
//! maintenance, delegation, and system-wide revocation all behave here the
//! way the real backend does.

use super::{AuthBackend, LoginResponse};
use crate::scope::{Conversation, Directory, Group};
use crate::{AuthError, AuthResult};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use parley_core::{Identity, ServerConfig};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Consecutive failed logins before an account locks
const MAX_FAILED_ATTEMPTS: u32 = 5;

struct UserRecord {
    identity: Identity,
    password_hash: Option<String>,
}

#[derive(Default)]
struct BackendState {
    /// Users by id
    users: HashMap<String, UserRecord>,
    /// Email -> user id
    emails: HashMap<String, String>,
    /// Outstanding tokens -> user id
    tokens: HashMap<String, String>,
    /// Consecutive failed login attempts per user id
    failed_attempts: HashMap<String, u32>,
    groups: HashMap<String, Group>,
    conversations: HashMap<String, Conversation>,
    /// Identity adopted in mode `none`
    implicit_user: Option<String>,
    /// Identity the SSO trust assertion resolves to (None = assertion invalid)
    sso_user: Option<String>,
}

/// In-memory backend for development and testing
pub struct MemoryBackend {
    /// None simulates an unreachable config endpoint
    config: RwLock<Option<ServerConfig>>,
    state: RwLock<BackendState>,
}

impl MemoryBackend {
    /// Create a new backend with the given negotiated configuration
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config: RwLock::new(Some(config)),
            state: RwLock::new(BackendState::default()),
        }
    }

    /// Register a user, hashing the password if one is given
    pub async fn add_user(&self, identity: Identity, password: Option<&str>) -> AuthResult<()> {
        let password_hash = match password {
            Some(password) => Some(hash_password(password)?),
            None => None,
        };

        let mut state = self.state.write().await;
        if let Some(email) = &identity.email {
            state.emails.insert(email.clone(), identity.id.clone());
        }
        debug!(user_id = %identity.id, role = %identity.role, "Registered user");
        state.users.insert(
            identity.id.clone(),
            UserRecord {
                identity,
                password_hash,
            },
        );
        Ok(())
    }

    /// Seed a group
    pub async fn add_group(&self, group: Group) {
        let mut state = self.state.write().await;
        state.groups.insert(group.id.clone(), group);
    }

    /// Seed a conversation, registering it with its home group if any
    pub async fn add_conversation(&self, conversation: Conversation) {
        let mut state = self.state.write().await;
        if let Some(group_id) = conversation.group_id.clone() {
            if let Some(group) = state.groups.get_mut(&group_id) {
                group.conversation_ids.push(conversation.id.clone());
            }
        }
        state
            .conversations
            .insert(conversation.id.clone(), conversation);
    }

    /// Select the identity adopted by implicit login (mode `none`)
    pub async fn set_implicit_user(&self, user_id: impl Into<String>) {
        self.state.write().await.implicit_user = Some(user_id.into());
    }

    /// Select the identity the SSO trust assertion resolves to
    pub async fn set_sso_user(&self, user_id: impl Into<String>) {
        self.state.write().await.sso_user = Some(user_id.into());
    }

    /// Toggle maintenance mode
    pub async fn set_maintenance(&self, maintenance: bool) {
        if let Some(config) = self.config.write().await.as_mut() {
            config.maintenance_mode = maintenance;
        }
    }

    /// Simulate the config endpoint going up or down
    pub async fn set_config_available(&self, available: bool, config: ServerConfig) {
        let mut guard = self.config.write().await;
        *guard = if available { Some(config) } else { None };
    }

    /// Number of currently outstanding tokens (test observability)
    pub async fn outstanding_sessions(&self) -> usize {
        self.state.read().await.tokens.len()
    }

    async fn issue_token(&self, user_id: &str) -> AuthResult<LoginResponse> {
        let allow_multi_login = self
            .config
            .read()
            .await
            .map(|c| c.allow_multi_login)
            .unwrap_or(false);

        let mut state = self.state.write().await;

        let identity = state
            .users
            .get(user_id)
            .map(|record| record.identity.clone())
            .ok_or(AuthError::InvalidCredentials)?;

        if !identity.is_active() {
            return Err(AuthError::forbidden("Account is disabled"));
        }

        // Single-session policy: a new session supersedes any other session
        // of the same identity
        if !allow_multi_login {
            state.tokens.retain(|_, owner| owner != user_id);
        }

        let token = uuid::Uuid::new_v4().to_string();
        state.tokens.insert(token.clone(), user_id.to_string());

        debug!(user_id = %user_id, "Issued session token");
        Ok(LoginResponse { token, identity })
    }
}

/// Resolve a token to its identity, or `Unauthorized`
fn authenticate(state: &BackendState, token: &str) -> AuthResult<Identity> {
    state
        .tokens
        .get(token)
        .and_then(|user_id| state.users.get(user_id))
        .map(|record| record.identity.clone())
        .ok_or(AuthError::Unauthorized)
}

#[async_trait]
impl AuthBackend for MemoryBackend {
    async fn fetch_config(&self) -> AuthResult<ServerConfig> {
        self.config
            .read()
            .await
            .ok_or_else(|| AuthError::network("Config endpoint unreachable"))
    }

    async fn implicit_login(&self) -> AuthResult<LoginResponse> {
        let user_id = self
            .state
            .read()
            .await
            .implicit_user
            .clone()
            .ok_or_else(|| AuthError::internal("No implicit identity configured"))?;

        self.issue_token(&user_id).await
    }

    async fn login(&self, email: &str, password: &str) -> AuthResult<LoginResponse> {
        let user_id = {
            let mut state = self.state.write().await;

            let user_id = match state.emails.get(email).cloned() {
                Some(user_id) => user_id,
                None => {
                    debug!(email = %email, "Login attempt for unknown email");
                    return Err(AuthError::InvalidCredentials);
                }
            };

            let attempts = state.failed_attempts.get(&user_id).copied().unwrap_or(0);
            if attempts >= MAX_FAILED_ATTEMPTS {
                warn!(user_id = %user_id, "Login attempt against locked account");
                return Err(AuthError::AccountLocked);
            }

            let verified = state
                .users
                .get(&user_id)
                .and_then(|record| record.password_hash.as_deref())
                .map(|hash| verify_password(password, hash))
                .unwrap_or(false);

            if !verified {
                let attempts = attempts + 1;
                state.failed_attempts.insert(user_id.clone(), attempts);
                warn!(user_id = %user_id, attempts, "Invalid password");
                return if attempts >= MAX_FAILED_ATTEMPTS {
                    Err(AuthError::AccountLocked)
                } else {
                    Err(AuthError::InvalidCredentials)
                };
            }

            state.failed_attempts.remove(&user_id);
            user_id
        };

        let response = self.issue_token(&user_id).await?;
        info!(user_id = %user_id, "User authenticated");
        Ok(response)
    }

    async fn verify_sso(&self) -> AuthResult<LoginResponse> {
        let user_id = self
            .state
            .read()
            .await
            .sso_user
            .clone()
            .ok_or_else(|| AuthError::sso_failed("Trust assertion rejected"))?;

        self.issue_token(&user_id).await
    }

    async fn verify_token(&self, token: &str) -> AuthResult<Identity> {
        let state = self.state.read().await;
        authenticate(&state, token)
    }

    async fn logout(&self, token: &str) -> AuthResult<()> {
        let mut state = self.state.write().await;
        state.tokens.remove(token);
        Ok(())
    }

    async fn fetch_directory(&self, token: &str) -> AuthResult<Directory> {
        let state = self.state.read().await;
        authenticate(&state, token)?;

        Ok(Directory {
            users: state
                .users
                .values()
                .map(|record| record.identity.clone())
                .collect(),
            groups: state.groups.values().cloned().collect(),
            conversations: state.conversations.values().cloned().collect(),
        })
    }

    async fn create_group(&self, token: &str, name: &str) -> AuthResult<Group> {
        let mut state = self.state.write().await;
        let caller = authenticate(&state, token)?;

        if !caller.is_root() {
            return Err(AuthError::forbidden("Only root may create groups"));
        }

        let group = Group::new(name, caller.id.as_str());
        state.groups.insert(group.id.clone(), group.clone());
        info!(group_id = %group.id, "Created group");
        Ok(group)
    }

    async fn delete_group(&self, token: &str, group_id: &str) -> AuthResult<()> {
        let mut state = self.state.write().await;
        let caller = authenticate(&state, token)?;

        let group = state
            .groups
            .get(group_id)
            .ok_or_else(|| AuthError::not_found(format!("Group {}", group_id)))?;

        if !caller.is_root() && group.owner_id != caller.id {
            return Err(AuthError::forbidden("Only root or the owner may delete a group"));
        }

        state.groups.remove(group_id);
        for conversation in state.conversations.values_mut() {
            if conversation.group_id.as_deref() == Some(group_id) {
                conversation.group_id = None;
            }
            conversation.shared_with_group_ids.remove(group_id);
        }
        for record in state.users.values_mut() {
            record.identity.managed_group_ids.remove(group_id);
            record.identity.member_group_ids.remove(group_id);
        }
        info!(group_id = %group_id, "Deleted group");
        Ok(())
    }

    async fn delegate_manager(
        &self,
        token: &str,
        manager_id: &str,
        group_id: &str,
    ) -> AuthResult<()> {
        let mut state = self.state.write().await;
        let caller = authenticate(&state, token)?;

        if !caller.is_root() {
            return Err(AuthError::forbidden("Only root may delegate managers"));
        }
        if !state.groups.contains_key(group_id) {
            return Err(AuthError::not_found(format!("Group {}", group_id)));
        }

        let record = state
            .users
            .get_mut(manager_id)
            .ok_or_else(|| AuthError::not_found(format!("User {}", manager_id)))?;

        if !record.identity.is_manager() {
            return Err(AuthError::forbidden("Delegation target is not a manager"));
        }

        record
            .identity
            .managed_group_ids
            .insert(group_id.to_string());
        Ok(())
    }

    async fn revoke_delegation(
        &self,
        token: &str,
        manager_id: &str,
        group_id: &str,
    ) -> AuthResult<()> {
        let mut state = self.state.write().await;
        let caller = authenticate(&state, token)?;

        if !caller.is_root() {
            return Err(AuthError::forbidden("Only root may revoke delegations"));
        }

        let record = state
            .users
            .get_mut(manager_id)
            .ok_or_else(|| AuthError::not_found(format!("User {}", manager_id)))?;

        record.identity.managed_group_ids.remove(group_id);
        Ok(())
    }

    async fn move_conversation(
        &self,
        token: &str,
        conversation_id: &str,
        dest_group_id: &str,
    ) -> AuthResult<Conversation> {
        let mut state = self.state.write().await;
        let caller = authenticate(&state, token)?;

        let conversation = state
            .conversations
            .get(conversation_id)
            .ok_or_else(|| AuthError::not_found(format!("Conversation {}", conversation_id)))?;

        let source_group_id = conversation.group_id.clone();

        let may_mutate = caller.is_root()
            || conversation.owner_id == caller.id
            || source_group_id
                .as_deref()
                .map(|g| caller.manages(g))
                .unwrap_or(false);
        if !may_mutate {
            return Err(AuthError::forbidden("No mutate rights over conversation"));
        }

        let dest = state
            .groups
            .get(dest_group_id)
            .ok_or_else(|| AuthError::not_found(format!("Group {}", dest_group_id)))?;

        if !caller.is_root() && dest.owner_id != caller.id && !caller.manages(dest_group_id) {
            return Err(AuthError::forbidden("No mutate rights over destination group"));
        }

        // All-or-nothing: retarget the home group and fix both membership lists
        if let Some(source_id) = &source_group_id {
            if let Some(source) = state.groups.get_mut(source_id) {
                source.conversation_ids.retain(|c| c != conversation_id);
            }
        }
        if let Some(dest) = state.groups.get_mut(dest_group_id) {
            dest.conversation_ids.push(conversation_id.to_string());
        }
        let conversation = state
            .conversations
            .get_mut(conversation_id)
            .ok_or_else(|| AuthError::internal("Conversation vanished mid-update"))?;
        conversation.group_id = Some(dest_group_id.to_string());

        debug!(
            conversation_id = %conversation_id,
            dest_group_id = %dest_group_id,
            "Moved conversation"
        );
        Ok(conversation.clone())
    }

    async fn share_conversation(
        &self,
        token: &str,
        conversation_id: &str,
        group_id: &str,
    ) -> AuthResult<Conversation> {
        let mut state = self.state.write().await;
        let caller = authenticate(&state, token)?;

        if !state.groups.contains_key(group_id) {
            return Err(AuthError::not_found(format!("Group {}", group_id)));
        }

        let conversation = state
            .conversations
            .get_mut(conversation_id)
            .ok_or_else(|| AuthError::not_found(format!("Conversation {}", conversation_id)))?;

        let may_share = caller.is_root()
            || conversation.owner_id == caller.id
            || conversation
                .group_id
                .as_deref()
                .map(|g| caller.manages(g))
                .unwrap_or(false);
        if !may_share {
            return Err(AuthError::forbidden("No share rights over conversation"));
        }

        // Idempotent: re-adding an already-shared group is a no-op
        conversation
            .shared_with_group_ids
            .insert(group_id.to_string());
        Ok(conversation.clone())
    }

    async fn unassign_group(
        &self,
        token: &str,
        conversation_id: &str,
    ) -> AuthResult<Conversation> {
        let mut state = self.state.write().await;
        let caller = authenticate(&state, token)?;

        let conversation = state
            .conversations
            .get(conversation_id)
            .ok_or_else(|| AuthError::not_found(format!("Conversation {}", conversation_id)))?;

        let source_group_id = conversation.group_id.clone();

        let may_mutate = caller.is_root()
            || conversation.owner_id == caller.id
            || source_group_id
                .as_deref()
                .map(|g| caller.manages(g))
                .unwrap_or(false);
        if !may_mutate {
            return Err(AuthError::forbidden("No mutate rights over conversation"));
        }

        if let Some(source_id) = &source_group_id {
            if let Some(source) = state.groups.get_mut(source_id) {
                source.conversation_ids.retain(|c| c != conversation_id);
            }
        }
        let conversation = state
            .conversations
            .get_mut(conversation_id)
            .ok_or_else(|| AuthError::internal("Conversation vanished mid-update"))?;
        // Home group cleared; sharing stays as-is
        conversation.group_id = None;
        Ok(conversation.clone())
    }

    async fn revoke_all_sessions(&self, token: &str) -> AuthResult<usize> {
        let mut state = self.state.write().await;
        let caller = authenticate(&state, token)?;

        if !caller.is_root() {
            return Err(AuthError::forbidden("Only root may revoke all sessions"));
        }

        let affected = state.tokens.len();
        state.tokens.clear();
        info!(affected, "Revoked all sessions");
        Ok(affected)
    }
}

/// Hash password using Argon2
fn hash_password(password: &str) -> AuthResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::internal(format!("Password hashing failed: {}", e)))
}

/// Verify password against hash
fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Exercises salt generation through OsRng alongside the verify path
    #[test]
    fn test_password_hash_verify_round_trip() {
        let hash = hash_password("password123").unwrap();
        assert!(verify_password("password123", &hash));
        assert!(!verify_password("password124", &hash));
        assert!(!verify_password("password123", "not-a-phc-string"));
    }
}
