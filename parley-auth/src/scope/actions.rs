//! Scope Actions
//!
//! Validated mutations over the backend plus reconciliation of the local
//! directory snapshot. Every action pre-checks capabilities through
//! [`ScopeEngine`] to fail fast, then treats the backend's answer as final:
//! a rejected call leaves the local snapshot untouched, a successful one is
//! applied atomically.

use super::engine::ScopeEngine;
use super::types::{Conversation, Directory, Group};
use crate::backend::AuthBackend;
use crate::{AuthError, AuthResult};
use parley_core::Identity;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

pub struct ScopeActions {
    backend: Arc<dyn AuthBackend>,
    directory: RwLock<Directory>,
}

impl ScopeActions {
    pub fn new(backend: Arc<dyn AuthBackend>) -> Self {
        Self {
            backend,
            directory: RwLock::new(Directory::default()),
        }
    }

    /// Replace the local snapshot with a fresh one from the backend
    pub async fn refresh(&self, token: &str) -> AuthResult<Directory> {
        let directory = self.backend.fetch_directory(token).await?;
        debug!(
            users = directory.users.len(),
            groups = directory.groups.len(),
            conversations = directory.conversations.len(),
            "Refreshed directory snapshot"
        );
        let mut guard = self.directory.write().await;
        *guard = directory.clone();
        Ok(directory)
    }

    /// Current local snapshot
    pub async fn directory(&self) -> Directory {
        self.directory.read().await.clone()
    }

    /// Share a conversation with a group.
    ///
    /// Idempotent: sharing with a group that already has the share is a
    /// no-op success. The conversation's home group is never touched.
    pub async fn share(
        &self,
        identity: &Identity,
        token: &str,
        conversation_id: &str,
        group_id: &str,
    ) -> AuthResult<Conversation> {
        let prior_home = {
            let dir = self.directory.read().await;
            let conversation = dir
                .conversation(conversation_id)
                .ok_or_else(|| AuthError::not_found(format!("Conversation {conversation_id}")))?;
            dir.group(group_id)
                .ok_or_else(|| AuthError::not_found(format!("Group {group_id}")))?;

            // Authorization first: an already-present share is a no-op only
            // for an actor entitled to make it
            if !ScopeEngine::can_share(identity, conversation) {
                return Err(AuthError::forbidden("Not allowed to share this conversation"));
            }
            if conversation.shared_with_group_ids.contains(group_id) {
                debug!(%conversation_id, %group_id, "Share already present; no-op");
                return Ok(conversation.clone());
            }
            conversation.group_id.clone()
        };

        let updated = match self
            .backend
            .share_conversation(token, conversation_id, group_id)
            .await
        {
            Ok(updated) => updated,
            Err(e) => return Err(self.reject(group_id, e).await),
        };

        if updated.group_id != prior_home {
            warn!(%conversation_id, "Share response altered the home group; rejecting");
            return Err(AuthError::internal("Share must not change the home group"));
        }

        info!(%conversation_id, %group_id, "Conversation shared");
        self.directory.write().await.upsert_conversation(updated.clone());
        Ok(updated)
    }

    /// Clear a conversation's home group, leaving its shares intact
    pub async fn unassign(
        &self,
        identity: &Identity,
        token: &str,
        conversation_id: &str,
    ) -> AuthResult<Conversation> {
        {
            let dir = self.directory.read().await;
            let conversation = dir
                .conversation(conversation_id)
                .ok_or_else(|| AuthError::not_found(format!("Conversation {conversation_id}")))?;
            if !ScopeEngine::can_mutate_conversation(identity, conversation) {
                return Err(AuthError::forbidden("Not allowed to modify this conversation"));
            }
        }

        let updated = self.backend.unassign_group(token, conversation_id).await?;

        let mut dir = self.directory.write().await;
        if let Some(old_home) = dir
            .conversation(conversation_id)
            .and_then(|c| c.group_id.clone())
        {
            if let Some(group) = dir.group_mut(&old_home) {
                group.conversation_ids.retain(|id| id != conversation_id);
            }
        }
        dir.upsert_conversation(updated.clone());
        Ok(updated)
    }

    /// Move a conversation to a new home group, all-or-nothing.
    ///
    /// Rights over both the conversation and the destination are required
    /// up front; any failure leaves the local snapshot untouched. On success
    /// the home pointer and both groups' conversation lists change together.
    pub async fn move_conversation(
        &self,
        identity: &Identity,
        token: &str,
        conversation_id: &str,
        dest_group_id: &str,
    ) -> AuthResult<Conversation> {
        {
            let dir = self.directory.read().await;
            let conversation = dir
                .conversation(conversation_id)
                .ok_or_else(|| AuthError::not_found(format!("Conversation {conversation_id}")))?;
            let destination = dir
                .group(dest_group_id)
                .ok_or_else(|| AuthError::not_found(format!("Group {dest_group_id}")))?;
            if !ScopeEngine::can_move(identity, conversation, destination) {
                return Err(AuthError::forbidden(
                    "Moving requires rights over the conversation and the destination group",
                ));
            }
        }

        let updated = match self
            .backend
            .move_conversation(token, conversation_id, dest_group_id)
            .await
        {
            Ok(updated) => updated,
            Err(e) => return Err(self.reject(dest_group_id, e).await),
        };

        let mut dir = self.directory.write().await;
        let old_home = dir
            .conversation(conversation_id)
            .and_then(|c| c.group_id.clone());
        if let Some(old_home) = old_home {
            if let Some(source) = dir.group_mut(&old_home) {
                source.conversation_ids.retain(|id| id != conversation_id);
            }
        }
        if let Some(destination) = dir.group_mut(dest_group_id) {
            if !destination
                .conversation_ids
                .iter()
                .any(|id| id == conversation_id)
            {
                destination.conversation_ids.push(conversation_id.to_string());
            }
        }
        dir.upsert_conversation(updated.clone());
        info!(%conversation_id, %dest_group_id, "Conversation moved");
        Ok(updated)
    }

    /// Create a group (root only)
    pub async fn create_group(
        &self,
        identity: &Identity,
        token: &str,
        name: &str,
    ) -> AuthResult<Group> {
        if !ScopeEngine::can_create_group(identity) {
            return Err(AuthError::forbidden("Only root may create groups"));
        }
        let group = self.backend.create_group(token, name).await?;
        info!(group_id = %group.id, %name, "Group created");
        self.directory.write().await.groups.push(group.clone());
        Ok(group)
    }

    /// Delete a group (root or group owner)
    pub async fn delete_group(
        &self,
        identity: &Identity,
        token: &str,
        group_id: &str,
    ) -> AuthResult<()> {
        {
            let dir = self.directory.read().await;
            let group = dir
                .group(group_id)
                .ok_or_else(|| AuthError::not_found(format!("Group {group_id}")))?;
            if !ScopeEngine::can_delete_group(identity, group) {
                return Err(AuthError::forbidden("Not allowed to delete this group"));
            }
        }

        match self.backend.delete_group(token, group_id).await {
            Ok(()) => {
                info!(%group_id, "Group deleted");
                self.directory.write().await.drop_group(group_id);
                Ok(())
            }
            Err(e) => Err(self.reject(group_id, e).await),
        }
    }

    /// Delegate management of a group to a manager (root only)
    pub async fn delegate_manager(
        &self,
        identity: &Identity,
        token: &str,
        manager_id: &str,
        group_id: &str,
    ) -> AuthResult<()> {
        if !ScopeEngine::can_delegate(identity) {
            return Err(AuthError::forbidden("Only root may delegate managers"));
        }
        match self
            .backend
            .delegate_manager(token, manager_id, group_id)
            .await
        {
            Ok(()) => {
                info!(%manager_id, %group_id, "Manager delegated");
                let mut dir = self.directory.write().await;
                if let Some(user) = dir.users.iter_mut().find(|u| u.id == manager_id) {
                    user.managed_group_ids.insert(group_id.to_string());
                }
                Ok(())
            }
            Err(e) => Err(self.reject(group_id, e).await),
        }
    }

    /// Revoke a manager delegation (root only)
    pub async fn revoke_delegation(
        &self,
        identity: &Identity,
        token: &str,
        manager_id: &str,
        group_id: &str,
    ) -> AuthResult<()> {
        if !ScopeEngine::can_delegate(identity) {
            return Err(AuthError::forbidden("Only root may revoke delegations"));
        }
        self.backend
            .revoke_delegation(token, manager_id, group_id)
            .await?;
        info!(%manager_id, %group_id, "Delegation revoked");
        let mut dir = self.directory.write().await;
        if let Some(user) = dir.users.iter_mut().find(|u| u.id == manager_id) {
            user.managed_group_ids.remove(group_id);
        }
        Ok(())
    }

    /// A `NotFound` from the backend means the group raced away underneath
    /// us; drop the stale reference so the snapshot converges.
    async fn reject(&self, group_id: &str, error: AuthError) -> AuthError {
        if matches!(error, AuthError::NotFound { .. }) {
            warn!(%group_id, "Backend reports group gone; dropping stale reference");
            self.directory.write().await.drop_group(group_id);
        }
        error
    }
}
