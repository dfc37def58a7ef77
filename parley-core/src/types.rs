//! Core data type definitions

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Role of an identity within the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full system administrator
    Root,
    /// Scoped administrator over delegated groups
    Manager,
    /// Regular participant
    User,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Root => write!(f, "root"),
            Role::Manager => write!(f, "manager"),
            Role::User => write!(f, "user"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "root" => Ok(Role::Root),
            "manager" => Ok(Role::Manager),
            "user" => Ok(Role::User),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// Account status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Disabled,
}

/// Negotiated authentication mode, fetched once per application boot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// No login required; an implicit identity is adopted at boot
    None,
    /// Email/password credentials submitted to the backend
    Local,
    /// Identity derived from trusted upstream headers, verified server-side
    Sso,
}

impl std::fmt::Display for AuthMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthMode::None => write!(f, "none"),
            AuthMode::Local => write!(f, "local"),
            AuthMode::Sso => write!(f, "sso"),
        }
    }
}

impl std::str::FromStr for AuthMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(AuthMode::None),
            "local" => Ok(AuthMode::Local),
            "sso" => Ok(AuthMode::Sso),
            _ => Err(format!("Unknown auth mode: {}", s)),
        }
    }
}

/// An authenticated identity, immutable for the lifetime of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Unique user identifier
    pub id: String,
    /// Display name (optional)
    pub display_name: Option<String>,
    /// User email (optional)
    pub email: Option<String>,
    /// Role within the system
    pub role: Role,
    /// Account status
    pub status: UserStatus,
    /// Groups this identity is delegated to manage (meaningful for managers)
    #[serde(default)]
    pub managed_group_ids: HashSet<String>,
    /// Groups this identity belongs to as a member
    #[serde(default)]
    pub member_group_ids: HashSet<String>,
}

impl Identity {
    /// Create a new identity with the given role
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            email: None,
            role,
            status: UserStatus::Active,
            managed_group_ids: HashSet::new(),
            member_group_ids: HashSet::new(),
        }
    }

    /// Set the display name
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Set the email address
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Add a manager delegation for a group
    pub fn with_managed_group(mut self, group_id: impl Into<String>) -> Self {
        self.managed_group_ids.insert(group_id.into());
        self
    }

    /// Add a group membership
    pub fn with_member_group(mut self, group_id: impl Into<String>) -> Self {
        self.member_group_ids.insert(group_id.into());
        self
    }

    pub fn is_root(&self) -> bool {
        self.role == Role::Root
    }

    pub fn is_manager(&self) -> bool {
        self.role == Role::Manager
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    /// Check whether this identity is delegated to manage a group
    pub fn manages(&self, group_id: &str) -> bool {
        self.managed_group_ids.contains(group_id)
    }

    /// Check whether this identity belongs to a group
    pub fn belongs_to(&self, group_id: &str) -> bool {
        self.member_group_ids.contains(group_id)
    }

    /// Get user display string for logging
    pub fn display_string(&self) -> String {
        match &self.display_name {
            Some(name) => format!("{} ({})", name, self.role),
            None => format!("{} ({})", self.id, self.role),
        }
    }
}

/// Server-negotiated authentication configuration, polled once per boot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Active authentication mode
    pub mode: AuthMode,
    /// Whether one identity may hold several concurrent sessions
    pub allow_multi_login: bool,
    /// Whether the system is in maintenance mode
    pub maintenance_mode: bool,
}

impl ServerConfig {
    pub fn new(mode: AuthMode) -> Self {
        Self {
            mode,
            allow_multi_login: false,
            maintenance_mode: false,
        }
    }

    pub fn with_multi_login(mut self, allow: bool) -> Self {
        self.allow_multi_login = allow;
        self
    }

    pub fn with_maintenance(mut self, maintenance: bool) -> Self {
        self.maintenance_mode = maintenance;
        self
    }
}

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the backend API
    pub server_url: String,
    /// Directory for persisted client state (session cache)
    pub data_dir: String,
    /// Request timeout for backend calls in seconds
    pub request_timeout_secs: u64,
}
