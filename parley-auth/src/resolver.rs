//! Auth Mode Resolver
//!
//! Fetches the negotiated authentication mode, multi-login policy, and
//! maintenance flag from the backend config endpoint. The result of a
//! successful fetch is cached for the lifetime of the boot; a failure is
//! `ConfigUnavailable` and never silently degrades to mode `none`, since
//! that would bypass intended access control.

use crate::backend::AuthBackend;
use crate::{AuthError, AuthResult};
use parley_core::ServerConfig;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

pub struct ModeResolver {
    backend: Arc<dyn AuthBackend>,
    cached: RwLock<Option<ServerConfig>>,
}

impl ModeResolver {
    pub fn new(backend: Arc<dyn AuthBackend>) -> Self {
        Self {
            backend,
            cached: RwLock::new(None),
        }
    }

    /// Resolve the server configuration, fetching it on first use.
    ///
    /// Only successful fetches are cached; a failed boot may call this again
    /// on explicit user action.
    pub async fn resolve(&self) -> AuthResult<ServerConfig> {
        if let Some(config) = *self.cached.read().await {
            return Ok(config);
        }

        let config = self.backend.fetch_config().await.map_err(|e| {
            warn!(error = %e, "Config fetch failed");
            AuthError::config_unavailable(e.to_string())
        })?;

        debug!(
            mode = %config.mode,
            maintenance = config.maintenance_mode,
            multi_login = config.allow_multi_login,
            "Resolved auth configuration"
        );

        let mut guard = self.cached.write().await;
        *guard = Some(config);
        Ok(config)
    }

    /// The cached configuration, if already resolved
    pub async fn cached(&self) -> Option<ServerConfig> {
        *self.cached.read().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use parley_core::AuthMode;

    #[tokio::test]
    async fn test_resolve_caches_success() {
        let backend = Arc::new(MemoryBackend::new(ServerConfig::new(AuthMode::Local)));
        let resolver = ModeResolver::new(backend.clone());

        let config = resolver.resolve().await.unwrap();
        assert_eq!(config.mode, AuthMode::Local);

        // The endpoint going away does not disturb the cached result
        backend
            .set_config_available(false, ServerConfig::new(AuthMode::Local))
            .await;
        let config = resolver.resolve().await.unwrap();
        assert_eq!(config.mode, AuthMode::Local);
    }

    #[tokio::test]
    async fn test_unreachable_config_is_fatal_not_defaulted() {
        let backend = Arc::new(MemoryBackend::new(ServerConfig::new(AuthMode::Local)));
        backend
            .set_config_available(false, ServerConfig::new(AuthMode::Local))
            .await;

        let resolver = ModeResolver::new(backend.clone());
        assert!(matches!(
            resolver.resolve().await,
            Err(AuthError::ConfigUnavailable { .. })
        ));
        assert!(resolver.cached().await.is_none());

        // Failure is not cached: once the endpoint is back, resolution works
        backend
            .set_config_available(true, ServerConfig::new(AuthMode::Sso))
            .await;
        let config = resolver.resolve().await.unwrap();
        assert_eq!(config.mode, AuthMode::Sso);
    }
}
