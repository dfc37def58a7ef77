//! Maintenance Gate
//!
//! Pure function of role and maintenance flag, evaluated immediately after
//! authentication and on every privileged action. It allows or blocks — it
//! never rewrites responses.

use crate::{AuthError, AuthResult};
use parley_core::Role;

/// Outcome of a maintenance-gate evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Maintenance off; no effect
    Allow,
    /// Maintenance on, root identity: access proceeds but a persistent
    /// banner must be surfaced to the consumer
    AllowWithBanner,
    /// Maintenance on, non-root identity: access is rejected
    Deny,
}

pub struct MaintenanceGate;

impl MaintenanceGate {
    /// Evaluate the gate for a role under the given maintenance flag
    pub fn evaluate(role: Role, maintenance_mode: bool) -> GateDecision {
        if !maintenance_mode {
            return GateDecision::Allow;
        }
        match role {
            Role::Root => GateDecision::AllowWithBanner,
            _ => GateDecision::Deny,
        }
    }

    /// Evaluate and convert `Deny` into `UnderMaintenance`; returns whether
    /// a banner must be shown
    pub fn check(role: Role, maintenance_mode: bool) -> AuthResult<bool> {
        match Self::evaluate(role, maintenance_mode) {
            GateDecision::Allow => Ok(false),
            GateDecision::AllowWithBanner => Ok(true),
            GateDecision::Deny => Err(AuthError::UnderMaintenance),
        }
    }
}
