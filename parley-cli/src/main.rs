//! Parley CLI - Command-line client for the Parley identity core
//!
//! Logs in against a Parley backend, persists the session locally so
//! subsequent invocations resume it, and exposes the scoped directory views
//! and administrative actions.

use clap::{Parser, Subcommand};
use parley_auth::backend::HttpBackend;
use parley_auth::{
    AuthPhase, LoginOrchestrator, RevocationController, ScopeActions, ScopeEngine, SessionStorage,
    SessionStore,
};
use parley_core::{
    init_logging, log_operation_error, log_operation_start, log_operation_success, ClientConfig,
    LoggingConfig,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "Command-line client for the Parley chat backend")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Backend base URL (overrides configuration)
    #[arg(short, long)]
    server: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with email and password (mode `local` only)
    Login {
        /// Account email
        email: String,

        /// Account password
        password: String,
    },

    /// Show the current identity and session
    Whoami,

    /// List the groups visible to the current identity
    Groups,

    /// List the conversations visible to the current identity
    Conversations,

    /// End the current session
    Logout,

    /// Revoke every session system-wide, including this one (root only)
    RevokeAll,

    /// Manage configuration
    Config {
        /// Show the effective configuration
        #[arg(long)]
        show: bool,

        /// Write a default configuration file
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut logging_config = LoggingConfig::default();
    if cli.verbose {
        logging_config.level = "debug".to_string();
    }
    init_logging(&logging_config)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Starting Parley CLI v{}", env!("CARGO_PKG_VERSION"));

    let mut config = load_config(cli.config.as_ref())?;
    if let Some(server) = cli.server {
        config.server_url = server;
    }
    config.validate()?;

    match cli.command {
        Commands::Login { email, password } => handle_login(&config, &email, &password).await?,
        Commands::Whoami => handle_whoami(&config).await?,
        Commands::Groups => handle_groups(&config).await?,
        Commands::Conversations => handle_conversations(&config).await?,
        Commands::Logout => handle_logout(&config).await?,
        Commands::RevokeAll => handle_revoke_all(&config).await?,
        Commands::Config { show, init } => handle_config(&config, cli.config.as_ref(), show, init)?,
    }

    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<ClientConfig> {
    match path {
        Some(path) => Ok(ClientConfig::from_file(path)?),
        None => {
            let default_path = default_config_path();
            if default_path.exists() {
                Ok(ClientConfig::from_file(default_path)?)
            } else {
                Ok(ClientConfig::default())
            }
        }
    }
}

fn default_config_path() -> PathBuf {
    PathBuf::from(ClientConfig::default().data_dir).join("config.toml")
}

/// Build an orchestrator over the persisted session directory and run the
/// boot flow, so every command starts from a verified session state
async fn boot(config: &ClientConfig) -> anyhow::Result<LoginOrchestrator> {
    let backend = Arc::new(HttpBackend::new(
        config.server_url.clone(),
        Duration::from_secs(config.request_timeout_secs),
    )?);
    let store = SessionStore::persistent(SessionStorage::new(&config.data_dir)?);

    let orchestrator = LoginOrchestrator::new(backend, store);
    orchestrator.boot().await?;

    if orchestrator.is_under_maintenance().await {
        println!("! The system is under maintenance; you are signed in as root.");
    }

    Ok(orchestrator)
}

async fn handle_login(config: &ClientConfig, email: &str, password: &str) -> anyhow::Result<()> {
    log_operation_start!("login", email = %email);

    let orchestrator = boot(config).await?;

    if orchestrator.is_authenticated().await {
        // boot() may have resumed or auto-logged-in already
        if let Some(identity) = orchestrator.current_identity().await {
            println!("Already signed in as {}", identity.display_string());
            return Ok(());
        }
    }

    match orchestrator.login(email, password).await {
        Ok(identity) => {
            log_operation_success!("login", user_id = %identity.id);
            println!("Signed in as {}", identity.display_string());
            Ok(())
        }
        Err(e) => {
            log_operation_error!("login", e);
            Err(e.into())
        }
    }
}

async fn handle_whoami(config: &ClientConfig) -> anyhow::Result<()> {
    let orchestrator = boot(config).await?;

    match orchestrator.current_session().await {
        Some(session) => {
            println!("User:  {}", session.identity.display_string());
            println!("Mode:  {}", session.mode);
            println!("Since: {}", session.established_at.to_rfc3339());
        }
        None => println!("Not signed in."),
    }
    Ok(())
}

async fn handle_groups(config: &ClientConfig) -> anyhow::Result<()> {
    let (orchestrator, actions) = scoped(config).await?;
    let session = orchestrator.ensure_operational().await?;

    let directory = actions.refresh(&session.token).await?;
    let groups = ScopeEngine::visible_groups(&session.identity, &directory);

    if groups.is_empty() {
        println!("No visible groups.");
        return Ok(());
    }
    for group in groups {
        println!(
            "{}  {} ({} conversations)",
            group.id,
            group.name,
            group.conversation_ids.len()
        );
    }
    Ok(())
}

async fn handle_conversations(config: &ClientConfig) -> anyhow::Result<()> {
    let (orchestrator, actions) = scoped(config).await?;
    let session = orchestrator.ensure_operational().await?;

    let directory = actions.refresh(&session.token).await?;
    let conversations = ScopeEngine::visible_conversations(&session.identity, &directory);

    if conversations.is_empty() {
        println!("No visible conversations.");
        return Ok(());
    }
    for conversation in conversations {
        let home = conversation.group_id.as_deref().unwrap_or("-");
        let shared = if conversation.is_shared() { " [shared]" } else { "" };
        println!(
            "{}  {} (group: {}){}",
            conversation.id, conversation.title, home, shared
        );
    }
    Ok(())
}

async fn handle_logout(config: &ClientConfig) -> anyhow::Result<()> {
    let orchestrator = boot(config).await?;

    if orchestrator.phase().await != AuthPhase::Authenticated {
        println!("Not signed in.");
        return Ok(());
    }
    orchestrator.logout().await?;
    println!("Signed out.");
    Ok(())
}

async fn handle_revoke_all(config: &ClientConfig) -> anyhow::Result<()> {
    log_operation_start!("revoke_all_sessions");
    let orchestrator = boot(config).await?;

    match RevocationController::revoke_all(&orchestrator).await {
        Ok(affected) => {
            log_operation_success!("revoke_all_sessions", affected = affected);
            println!(
                "Revoked {} session(s), including this one. Sign in again to continue.",
                affected
            );
            Ok(())
        }
        Err(e) => {
            log_operation_error!("revoke_all_sessions", e);
            Err(e.into())
        }
    }
}

fn handle_config(
    config: &ClientConfig,
    path: Option<&PathBuf>,
    show: bool,
    init: bool,
) -> anyhow::Result<()> {
    if init {
        let target = path.cloned().unwrap_or_else(default_config_path);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        ClientConfig::default().save_to_file(&target)?;
        println!("Wrote default configuration to {}", target.display());
    }
    if show || !init {
        println!("{}", toml::to_string_pretty(config)?);
    }
    Ok(())
}

/// Boot plus a scope-action layer over the same backend
async fn scoped(config: &ClientConfig) -> anyhow::Result<(LoginOrchestrator, ScopeActions)> {
    let orchestrator = boot(config).await?;
    let actions = ScopeActions::new(orchestrator.backend());
    Ok((orchestrator, actions))
}
