//! Scope Engine
//!
//! Pure, synchronous functions of `(&Identity, &Directory)` that compute what
//! the current identity may see and do. The backend enforces the same rules
//! authoritatively; these checks exist to fail fast and keep the UI honest.

use super::types::{Conversation, Directory, Group};
use parley_core::{Identity, Role};

pub struct ScopeEngine;

impl ScopeEngine {
    /// Groups visible to the identity.
    ///
    /// Root sees every group. A manager sees exactly the groups delegated to
    /// them, nothing more. A user sees the groups they belong to.
    pub fn visible_groups<'a>(identity: &Identity, directory: &'a Directory) -> Vec<&'a Group> {
        match identity.role {
            Role::Root => directory.groups.iter().collect(),
            Role::Manager => directory
                .groups
                .iter()
                .filter(|g| identity.manages(&g.id))
                .collect(),
            Role::User => directory
                .groups
                .iter()
                .filter(|g| identity.belongs_to(&g.id))
                .collect(),
        }
    }

    /// Users visible to the identity.
    ///
    /// Root sees everyone; a manager sees the members of their managed groups
    /// (and themselves); a user sees only themselves.
    pub fn visible_users<'a>(identity: &Identity, directory: &'a Directory) -> Vec<&'a Identity> {
        match identity.role {
            Role::Root => directory.users.iter().collect(),
            Role::Manager => directory
                .users
                .iter()
                .filter(|u| {
                    u.id == identity.id
                        || identity
                            .managed_group_ids
                            .iter()
                            .any(|gid| directory.group(gid).is_some_and(|g| g.has_member(&u.id)))
                })
                .collect(),
            Role::User => directory
                .users
                .iter()
                .filter(|u| u.id == identity.id)
                .collect(),
        }
    }

    /// Conversations visible to the identity.
    ///
    /// Root sees everything. A manager sees conversations homed in or shared
    /// into their managed groups, plus their own. A user sees their own
    /// conversations plus conversations shared into groups they belong to.
    pub fn visible_conversations<'a>(
        identity: &Identity,
        directory: &'a Directory,
    ) -> Vec<&'a Conversation> {
        directory
            .conversations
            .iter()
            .filter(|c| Self::can_view_conversation(identity, c))
            .collect()
    }

    pub fn can_view_conversation(identity: &Identity, conversation: &Conversation) -> bool {
        match identity.role {
            Role::Root => true,
            Role::Manager => {
                conversation.owner_id == identity.id
                    || conversation
                        .group_id
                        .as_deref()
                        .is_some_and(|gid| identity.manages(gid))
                    || conversation.shared_into_any(&identity.managed_group_ids)
                    || conversation.shared_into_any(&identity.member_group_ids)
            }
            Role::User => {
                conversation.owner_id == identity.id
                    || conversation.shared_into_any(&identity.member_group_ids)
            }
        }
    }

    /// Whether the identity may administer the group (rename, manage its
    /// conversation list). Root always; a manager only within delegation.
    pub fn can_manage_group(identity: &Identity, group: &Group) -> bool {
        identity.is_root() || group.owner_id == identity.id || identity.manages(&group.id)
    }

    /// Whether the identity may mutate the conversation (retitle, share,
    /// move, unassign). Ownership grants it; so does managing its home group.
    pub fn can_mutate_conversation(identity: &Identity, conversation: &Conversation) -> bool {
        identity.is_root()
            || conversation.owner_id == identity.id
            || conversation
                .group_id
                .as_deref()
                .is_some_and(|gid| identity.manages(gid))
    }

    /// Deletion follows the same rights as mutation
    pub fn can_delete_conversation(identity: &Identity, conversation: &Conversation) -> bool {
        Self::can_mutate_conversation(identity, conversation)
    }

    /// Sharing follows mutate rights over the conversation alone; the target
    /// group only has to exist. No rights over the target are required.
    pub fn can_share(identity: &Identity, conversation: &Conversation) -> bool {
        Self::can_mutate_conversation(identity, conversation)
    }

    /// Moving requires mutate rights over the conversation and administrative
    /// rights over the destination group. Both must hold before anything is
    /// touched.
    pub fn can_move(
        identity: &Identity,
        conversation: &Conversation,
        destination: &Group,
    ) -> bool {
        Self::can_mutate_conversation(identity, conversation)
            && Self::can_manage_group(identity, destination)
    }

    pub fn can_create_group(identity: &Identity) -> bool {
        identity.is_root()
    }

    pub fn can_delete_group(identity: &Identity, group: &Group) -> bool {
        identity.is_root() || group.owner_id == identity.id
    }

    pub fn can_delegate(identity: &Identity) -> bool {
        identity.is_root()
    }

    pub fn can_toggle_maintenance(identity: &Identity) -> bool {
        identity.is_root()
    }

    pub fn can_revoke_sessions(identity: &Identity) -> bool {
        identity.is_root()
    }
}
