//! Integration tests for parley-core infrastructure

use parley_core::{
    config_error, validation_error, AuthMode, ClientConfig, ErrorContext, Identity, ParleyError,
    Role, ServerConfig, UserStatus,
};

#[test]
fn test_error_handling() {
    let error = config_error!("Test config error", "test_component");

    match &error {
        ParleyError::Config {
            message, context, ..
        } => {
            assert_eq!(message, "Test config error");
            assert_eq!(context.component, "test_component");
            assert!(!context.error_id.is_empty());
        }
        _ => panic!("Expected Config error"),
    }

    // Logging an error should not panic
    error.log();

    let network_error = ParleyError::Network {
        message: "Connection failed".to_string(),
        source: None,
        context: ErrorContext::new("test"),
    };
    assert!(network_error.is_recoverable());

    let validation = validation_error!("bad field", "server_url", "test");
    assert!(!validation.is_recoverable());
}

#[test]
fn test_role_and_mode_parsing() {
    assert_eq!("root".parse::<Role>().unwrap(), Role::Root);
    assert_eq!("Manager".parse::<Role>().unwrap(), Role::Manager);
    assert_eq!("user".parse::<Role>().unwrap(), Role::User);
    assert!("superuser".parse::<Role>().is_err());

    assert_eq!("none".parse::<AuthMode>().unwrap(), AuthMode::None);
    assert_eq!("local".parse::<AuthMode>().unwrap(), AuthMode::Local);
    assert_eq!("SSO".parse::<AuthMode>().unwrap(), AuthMode::Sso);
    assert!("oauth".parse::<AuthMode>().is_err());

    assert_eq!(Role::Manager.to_string(), "manager");
    assert_eq!(AuthMode::Sso.to_string(), "sso");
}

#[test]
fn test_identity_helpers() {
    let manager = Identity::new("mgr-1", Role::Manager)
        .with_display_name("Jane Manager")
        .with_email("jane@example.com")
        .with_managed_group("group-1")
        .with_member_group("group-2");

    assert!(manager.is_manager());
    assert!(!manager.is_root());
    assert!(manager.is_active());
    assert!(manager.manages("group-1"));
    assert!(!manager.manages("group-2"));
    assert!(manager.belongs_to("group-2"));
    assert_eq!(manager.display_string(), "Jane Manager (manager)");

    let mut disabled = Identity::new("u-1", Role::User);
    disabled.status = UserStatus::Disabled;
    assert!(!disabled.is_active());
}

#[test]
fn test_server_config_wire_format() {
    // The config endpoint speaks camelCase
    let json = r#"{"mode":"local","allowMultiLogin":false,"maintenanceMode":true}"#;
    let config: ServerConfig = serde_json::from_str(json).unwrap();

    assert_eq!(config.mode, AuthMode::Local);
    assert!(!config.allow_multi_login);
    assert!(config.maintenance_mode);

    let round_trip = serde_json::to_string(&config).unwrap();
    assert!(round_trip.contains("allowMultiLogin"));
    assert!(round_trip.contains("maintenanceMode"));
}

#[test]
fn test_client_config_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("parley.toml");

    let config = ClientConfig {
        server_url: "https://chat.example.com".to_string(),
        data_dir: dir.path().to_string_lossy().into_owned(),
        request_timeout_secs: 10,
    };

    config.save_to_file(&path).unwrap();
    let loaded = ClientConfig::from_file(&path).unwrap();

    assert_eq!(loaded.server_url, config.server_url);
    assert_eq!(loaded.request_timeout_secs, 10);
}

#[test]
fn test_client_config_validation() {
    let mut config = ClientConfig::default();
    assert!(config.validate().is_ok());

    config.server_url = String::new();
    assert!(config.validate().is_err());

    config.server_url = "ftp://example.com".to_string();
    assert!(config.validate().is_err());

    config.server_url = "http://localhost:8080".to_string();
    config.request_timeout_secs = 0;
    assert!(config.validate().is_err());
}
