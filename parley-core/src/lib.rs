//! Parley Core - Core data structures for the Parley chat client
//!
//! This module defines the shared abstractions used across the client:
//! identity and role types, the negotiated authentication mode, the unified
//! error system, client configuration, and logging bootstrap.

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use error::*;
pub use logging::*;
pub use types::*;

// Re-export commonly used external types
pub use tokio;
pub use tracing;
