//! Group and conversation types

use chrono::{DateTime, Utc};
use parley_core::Identity;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A group of users and conversations, owned by exactly one identity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    /// Unique group identifier
    pub id: String,
    /// Group name
    pub name: String,
    /// Owning identity (root or the creator)
    pub owner_id: String,
    /// Conversations homed in this group, in display order
    pub conversation_ids: Vec<String>,
    /// Identities belonging to this group (membership is root-administered)
    #[serde(default)]
    pub member_ids: HashSet<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Group {
    /// Create a new group owned by the given identity
    pub fn new(name: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            owner_id: owner_id.into(),
            conversation_ids: Vec::new(),
            member_ids: HashSet::new(),
            created_at: Utc::now(),
        }
    }

    pub fn has_member(&self, user_id: &str) -> bool {
        self.member_ids.contains(user_id)
    }
}

/// A conversation with one optional home group and any number of share targets
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Unique conversation identifier
    pub id: String,
    /// Conversation title
    pub title: String,
    /// Owning identity
    pub owner_id: String,
    /// Organizational home group (at most one)
    pub group_id: Option<String>,
    /// Groups this conversation is additionally shared with (read access);
    /// sharing never transfers ownership
    #[serde(default)]
    pub shared_with_group_ids: HashSet<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a new conversation owned by the given identity
    pub fn new(title: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            owner_id: owner_id.into(),
            group_id: None,
            shared_with_group_ids: HashSet::new(),
            created_at: Utc::now(),
        }
    }

    /// Home the conversation in a group
    pub fn with_group(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    /// Derived: whether this conversation is shared with any group
    pub fn is_shared(&self) -> bool {
        !self.shared_with_group_ids.is_empty()
    }

    /// Whether this conversation is visible through a share into one of the
    /// given groups
    pub fn shared_into_any(&self, group_ids: &HashSet<String>) -> bool {
        self.shared_with_group_ids
            .iter()
            .any(|g| group_ids.contains(g))
    }
}

/// Snapshot of the user/group/conversation universe, fetched from the backend.
///
/// The backend remains the source of truth; this snapshot is a cache the scope
/// engine filters defensively.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Directory {
    pub users: Vec<Identity>,
    pub groups: Vec<Group>,
    pub conversations: Vec<Conversation>,
}

impl Directory {
    pub fn group(&self, group_id: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == group_id)
    }

    pub fn group_mut(&mut self, group_id: &str) -> Option<&mut Group> {
        self.groups.iter_mut().find(|g| g.id == group_id)
    }

    pub fn conversation(&self, conversation_id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == conversation_id)
    }

    pub fn conversation_mut(&mut self, conversation_id: &str) -> Option<&mut Conversation> {
        self.conversations
            .iter_mut()
            .find(|c| c.id == conversation_id)
    }

    pub fn user(&self, user_id: &str) -> Option<&Identity> {
        self.users.iter().find(|u| u.id == user_id)
    }

    /// Drop a group that vanished on the backend, clearing stale references
    /// from conversations that pointed at it
    pub fn drop_group(&mut self, group_id: &str) {
        self.groups.retain(|g| g.id != group_id);
        for conversation in &mut self.conversations {
            if conversation.group_id.as_deref() == Some(group_id) {
                conversation.group_id = None;
            }
            conversation.shared_with_group_ids.remove(group_id);
        }
    }

    /// Replace a conversation with the backend's authoritative copy
    pub fn upsert_conversation(&mut self, conversation: Conversation) {
        match self.conversation_mut(&conversation.id) {
            Some(existing) => *existing = conversation,
            None => self.conversations.push(conversation),
        }
    }
}
