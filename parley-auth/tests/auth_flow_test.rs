//! End-to-end tests for the login flows: mode resolution, the state machine,
//! maintenance gating, session persistence, multi-login supersession, and
//! bulk revocation.

use parley_auth::backend::MemoryBackend;
use parley_auth::{
    AuthBackend, AuthError, AuthPhase, LoginOrchestrator, RevocationController, SessionStorage,
    SessionStore,
};
use parley_core::{AuthMode, Identity, Role, ServerConfig};
use std::sync::Arc;

async fn seeded_backend(config: ServerConfig) -> Arc<MemoryBackend> {
    let backend = Arc::new(MemoryBackend::new(config));

    backend
        .add_user(
            Identity::new("root-1", Role::Root)
                .with_display_name("Admin")
                .with_email("admin@example.com"),
            Some("root-secret"),
        )
        .await
        .unwrap();
    backend
        .add_user(
            Identity::new("usr-1", Role::User)
                .with_display_name("John Doe")
                .with_email("john.doe@example.com"),
            Some("password123"),
        )
        .await
        .unwrap();

    backend
}

#[tokio::test]
async fn test_mode_none_boots_straight_to_authenticated() {
    let backend = seeded_backend(ServerConfig::new(AuthMode::None)).await;
    backend.set_implicit_user("usr-1").await;

    let orchestrator = LoginOrchestrator::new(backend, SessionStore::ephemeral());
    let phase = orchestrator.boot().await.unwrap();

    assert_eq!(phase, AuthPhase::Authenticated);
    assert_eq!(orchestrator.current_identity().await.unwrap().id, "usr-1");
}

#[tokio::test]
async fn test_local_boot_waits_for_credentials_then_login_succeeds() {
    let backend = seeded_backend(ServerConfig::new(AuthMode::Local)).await;
    let orchestrator = LoginOrchestrator::new(backend, SessionStore::ephemeral());

    assert_eq!(orchestrator.boot().await.unwrap(), AuthPhase::Unauthenticated);
    assert!(!orchestrator.is_authenticated().await);

    let identity = orchestrator
        .login("john.doe@example.com", "password123")
        .await
        .unwrap();

    assert_eq!(identity.role, Role::User);
    assert_eq!(orchestrator.phase().await, AuthPhase::Authenticated);
    assert_eq!(
        orchestrator.current_session().await.unwrap().mode,
        AuthMode::Local
    );
}

#[tokio::test]
async fn test_failed_login_is_reentrant() {
    let backend = seeded_backend(ServerConfig::new(AuthMode::Local)).await;
    let orchestrator = LoginOrchestrator::new(backend, SessionStore::ephemeral());
    orchestrator.boot().await.unwrap();

    let err = orchestrator
        .login("john.doe@example.com", "wrong")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));
    assert!(err.is_recoverable());
    assert_eq!(orchestrator.phase().await, AuthPhase::Failed);

    // A corrected attempt goes straight through
    orchestrator
        .login("john.doe@example.com", "password123")
        .await
        .unwrap();
    assert_eq!(orchestrator.phase().await, AuthPhase::Authenticated);
}

#[tokio::test]
async fn test_lockout_after_repeated_failures() {
    let backend = seeded_backend(ServerConfig::new(AuthMode::Local)).await;
    let orchestrator = LoginOrchestrator::new(backend, SessionStore::ephemeral());
    orchestrator.boot().await.unwrap();

    for _ in 0..4 {
        let err = orchestrator
            .login("john.doe@example.com", "wrong")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }
    let err = orchestrator
        .login("john.doe@example.com", "wrong")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::AccountLocked));

    // Even the right password no longer works
    let err = orchestrator
        .login("john.doe@example.com", "password123")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::AccountLocked));
}

#[tokio::test]
async fn test_login_forbidden_outside_local_mode() {
    let backend = seeded_backend(ServerConfig::new(AuthMode::None)).await;
    backend.set_implicit_user("usr-1").await;

    let orchestrator = LoginOrchestrator::new(backend, SessionStore::ephemeral());
    orchestrator.boot().await.unwrap();

    let err = orchestrator
        .login("john.doe@example.com", "password123")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Forbidden { .. }));
}

#[tokio::test]
async fn test_sso_auto_login() {
    let backend = seeded_backend(ServerConfig::new(AuthMode::Sso)).await;
    backend.set_sso_user("usr-1").await;

    let orchestrator = LoginOrchestrator::new(backend, SessionStore::ephemeral());
    assert_eq!(orchestrator.boot().await.unwrap(), AuthPhase::Authenticated);
    assert_eq!(
        orchestrator.current_session().await.unwrap().mode,
        AuthMode::Sso
    );
}

#[tokio::test]
async fn test_sso_rejection_is_terminal() {
    // No SSO user configured: the trust assertion does not resolve
    let backend = seeded_backend(ServerConfig::new(AuthMode::Sso)).await;
    let orchestrator = LoginOrchestrator::new(backend, SessionStore::ephemeral());

    let err = orchestrator.boot().await.unwrap_err();
    assert!(matches!(err, AuthError::SsoVerificationFailed { .. }));
    assert!(!err.is_recoverable());
    assert_eq!(orchestrator.phase().await, AuthPhase::Failed);
}

#[tokio::test]
async fn test_unreachable_config_fails_boot_without_defaulting() {
    let backend = seeded_backend(ServerConfig::new(AuthMode::Local)).await;
    backend
        .set_config_available(false, ServerConfig::new(AuthMode::Local))
        .await;

    let orchestrator = LoginOrchestrator::new(backend, SessionStore::ephemeral());
    let err = orchestrator.boot().await.unwrap_err();

    assert!(matches!(err, AuthError::ConfigUnavailable { .. }));
    assert_eq!(orchestrator.phase().await, AuthPhase::Unauthenticated);
}

#[tokio::test]
async fn test_maintenance_blocks_non_root_login_and_drops_the_session() {
    let backend =
        seeded_backend(ServerConfig::new(AuthMode::Local).with_maintenance(true)).await;
    let orchestrator = LoginOrchestrator::new(backend.clone(), SessionStore::ephemeral());
    orchestrator.boot().await.unwrap();

    // Credentials are fine, access is not
    let err = orchestrator
        .login("john.doe@example.com", "password123")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::UnderMaintenance));
    assert_eq!(orchestrator.phase().await, AuthPhase::Unauthenticated);
    assert!(orchestrator.current_session().await.is_none());
    // The just-issued token was released server-side too
    assert_eq!(backend.outstanding_sessions().await, 0);
}

#[tokio::test]
async fn test_maintenance_lets_root_in_with_banner() {
    let backend =
        seeded_backend(ServerConfig::new(AuthMode::Local).with_maintenance(true)).await;
    let orchestrator = LoginOrchestrator::new(backend, SessionStore::ephemeral());
    orchestrator.boot().await.unwrap();

    let identity = orchestrator
        .login("admin@example.com", "root-secret")
        .await
        .unwrap();

    assert_eq!(identity.role, Role::Root);
    assert_eq!(orchestrator.phase().await, AuthPhase::Authenticated);
    assert!(orchestrator.is_under_maintenance().await);
}

#[tokio::test]
async fn test_persisted_session_resumes_after_verification() {
    let dir = tempfile::tempdir().unwrap();
    let backend = seeded_backend(ServerConfig::new(AuthMode::Local)).await;

    {
        let store = SessionStore::persistent(SessionStorage::new(dir.path()).unwrap());
        let orchestrator = LoginOrchestrator::new(backend.clone(), store);
        orchestrator.boot().await.unwrap();
        orchestrator
            .login("john.doe@example.com", "password123")
            .await
            .unwrap();
    }

    // A fresh client over the same state directory resumes without credentials
    let store = SessionStore::persistent(SessionStorage::new(dir.path()).unwrap());
    let orchestrator = LoginOrchestrator::new(backend, store);
    let phase = orchestrator.boot().await.unwrap();

    assert_eq!(phase, AuthPhase::Authenticated);
    assert_eq!(orchestrator.current_identity().await.unwrap().id, "usr-1");
}

#[tokio::test]
async fn test_stale_persisted_token_is_discarded() {
    let dir = tempfile::tempdir().unwrap();
    let backend = seeded_backend(ServerConfig::new(AuthMode::Local)).await;

    let token = {
        let store = SessionStore::persistent(SessionStorage::new(dir.path()).unwrap());
        let orchestrator = LoginOrchestrator::new(backend.clone(), store);
        orchestrator.boot().await.unwrap();
        orchestrator
            .login("john.doe@example.com", "password123")
            .await
            .unwrap();
        orchestrator.current_session().await.unwrap().token
    };

    // The token dies server-side while the client is away
    backend.logout(&token).await.unwrap();

    let store = SessionStore::persistent(SessionStorage::new(dir.path()).unwrap());
    let orchestrator = LoginOrchestrator::new(backend, store);
    let phase = orchestrator.boot().await.unwrap();

    assert_eq!(phase, AuthPhase::Unauthenticated);
    // The cache is gone; nothing will retry that token
    assert!(orchestrator.current_session().await.is_none());
}

#[tokio::test]
async fn test_new_login_supersedes_old_session_without_multi_login() {
    let backend = seeded_backend(ServerConfig::new(AuthMode::Local)).await;

    let first = LoginOrchestrator::new(backend.clone(), SessionStore::ephemeral());
    first.boot().await.unwrap();
    first
        .login("john.doe@example.com", "password123")
        .await
        .unwrap();
    let first_token = first.current_session().await.unwrap().token;

    let second = LoginOrchestrator::new(backend.clone(), SessionStore::ephemeral());
    second.boot().await.unwrap();
    second
        .login("john.doe@example.com", "password123")
        .await
        .unwrap();

    // The earlier session's token is now dead
    let err = backend.verify_token(&first_token).await.unwrap_err();
    assert!(matches!(err, AuthError::Unauthorized));

    // The first client reacts with a forced logout
    first.handle_unauthorized().await.unwrap();
    assert_eq!(first.phase().await, AuthPhase::Unauthenticated);
}

#[tokio::test]
async fn test_multi_login_keeps_both_sessions() {
    let backend =
        seeded_backend(ServerConfig::new(AuthMode::Local).with_multi_login(true)).await;

    let first = LoginOrchestrator::new(backend.clone(), SessionStore::ephemeral());
    first.boot().await.unwrap();
    first
        .login("john.doe@example.com", "password123")
        .await
        .unwrap();
    let first_token = first.current_session().await.unwrap().token;

    let second = LoginOrchestrator::new(backend.clone(), SessionStore::ephemeral());
    second.boot().await.unwrap();
    second
        .login("john.doe@example.com", "password123")
        .await
        .unwrap();

    assert!(backend.verify_token(&first_token).await.is_ok());
    assert_eq!(backend.outstanding_sessions().await, 2);
}

#[tokio::test]
async fn test_logout_clears_session_on_both_sides() {
    let backend = seeded_backend(ServerConfig::new(AuthMode::Local)).await;
    let orchestrator = LoginOrchestrator::new(backend.clone(), SessionStore::ephemeral());
    orchestrator.boot().await.unwrap();
    orchestrator
        .login("john.doe@example.com", "password123")
        .await
        .unwrap();

    orchestrator.logout().await.unwrap();

    assert_eq!(orchestrator.phase().await, AuthPhase::Unauthenticated);
    assert!(orchestrator.current_session().await.is_none());
    assert_eq!(backend.outstanding_sessions().await, 0);
}

#[tokio::test]
async fn test_revoke_all_kills_every_token_including_roots_own() {
    let backend = seeded_backend(ServerConfig::new(AuthMode::Local)).await;

    let user = LoginOrchestrator::new(backend.clone(), SessionStore::ephemeral());
    user.boot().await.unwrap();
    user.login("john.doe@example.com", "password123")
        .await
        .unwrap();

    let root = LoginOrchestrator::new(backend.clone(), SessionStore::ephemeral());
    root.boot().await.unwrap();
    root.login("admin@example.com", "root-secret").await.unwrap();
    let user_token = user.current_session().await.unwrap().token;

    let affected = RevocationController::revoke_all(&root).await.unwrap();

    assert_eq!(affected, 2);
    assert_eq!(backend.outstanding_sessions().await, 0);
    assert_eq!(root.phase().await, AuthPhase::Unauthenticated);
    assert!(matches!(
        backend.verify_token(&user_token).await.unwrap_err(),
        AuthError::Unauthorized
    ));
}

#[tokio::test]
async fn test_revoke_all_requires_root() {
    let backend = seeded_backend(ServerConfig::new(AuthMode::Local)).await;
    let orchestrator = LoginOrchestrator::new(backend.clone(), SessionStore::ephemeral());
    orchestrator.boot().await.unwrap();
    orchestrator
        .login("john.doe@example.com", "password123")
        .await
        .unwrap();

    let err = RevocationController::revoke_all(&orchestrator).await.unwrap_err();
    assert!(matches!(err, AuthError::Forbidden { .. }));
    // The non-root session survives its own failed attempt
    assert_eq!(backend.outstanding_sessions().await, 1);
}
