//! Authorization Scope Module
//!
//! Computes, for the current identity, the visible and operable sets of
//! groups, users, and conversations, and performs the validated mutations
//! (share, move, group administration) that flow from them.

pub mod actions;
pub mod engine;
pub mod types;

pub use actions::ScopeActions;
pub use engine::ScopeEngine;
pub use types::{Conversation, Directory, Group};
