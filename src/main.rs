use std::fs;
use std::sync::Arc;

use anyhow::bail;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use chronicle::auth::{AuthEvents, LogMailer, TokenGenerator};
use chronicle::config::ServerConfig;
use chronicle::server::{AppState, create_router};
use chronicle::store::{SqliteStore, Store};
use chronicle::types::{Profile, Role, ServiceToken, User};

fn create_service_token(generator: &TokenGenerator) -> anyhow::Result<(ServiceToken, String)> {
    let (raw_token, lookup, hash) = generator.generate()?;
    let token = ServiceToken {
        id: Uuid::new_v4().to_string(),
        token_hash: hash,
        token_lookup: lookup,
        created_at: Utc::now(),
        last_used_at: None,
    };
    Ok((token, raw_token))
}

#[cfg(unix)]
fn set_restrictive_permissions(path: &std::path::Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        tracing::warn!("Failed to set permissions on {}: {e}", path.display());
    }
}

#[derive(Parser)]
#[command(name = "chronicle")]
#[command(about = "A content server for small local-history websites", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(long, short, default_value = "8080")]
        port: u16,

        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Public base URL for external access (e.g., "https://history.example.org").
        /// Used when building magic-link URLs. If not set, links use the bind address.
        #[arg(long)]
        public_base_url: Option<String>,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Initialize the server (create database and service token)
    Init {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Skip interactive prompts
        #[arg(long)]
        non_interactive: bool,
    },
}

fn run_init(data_dir: String, non_interactive: bool) -> anyhow::Result<()> {
    let data_path: std::path::PathBuf = data_dir.into();
    fs::create_dir_all(&data_path)?;

    let db_path = data_path.join("chronicle.db");
    let store = SqliteStore::new(&db_path)?;
    store.initialize()?;

    let token_file = data_path.join(".service_token");

    if store.has_service_token()? {
        bail!(
            "Server already initialized. Service token exists at: {}",
            token_file.display()
        );
    }

    let generator = TokenGenerator::new();
    let (token, raw_token) = create_service_token(&generator)?;

    store.create_service_token(&token)?;
    fs::write(&token_file, &raw_token)?;

    #[cfg(unix)]
    set_restrictive_permissions(&token_file);

    println!();
    println!("========================================");
    println!("Service token (save this, it won't be shown again):");
    println!();
    println!("  {raw_token}");
    println!();
    println!("Token also written to: {}", token_file.display());
    println!("========================================");
    println!();

    if !non_interactive {
        create_admin_user_prompt(&store, &generator)?;
    }

    Ok(())
}

fn create_admin_user_prompt(store: &SqliteStore, generator: &TokenGenerator) -> anyhow::Result<()> {
    let create_admin = inquire::Confirm::new("Would you like to create an admin user?")
        .with_default(true)
        .prompt()?;

    if !create_admin {
        return Ok(());
    }

    let email = inquire::Text::new("Email:")
        .with_validator(|input: &str| {
            if input.trim().is_empty() {
                Err("Email cannot be empty".into())
            } else if !input.contains('@') {
                Err("Email must contain '@'".into())
            } else {
                Ok(inquire::validator::Validation::Valid)
            }
        })
        .prompt()?;

    let password = inquire::Password::new("Password:")
        .with_validator(|input: &str| {
            if input.len() < 8 {
                Err("Password must be at least 8 characters".into())
            } else {
                Ok(inquire::validator::Validation::Valid)
            }
        })
        .prompt()?;

    let email = email.trim().to_lowercase();
    let password_hash = generator.hash(&password)?;

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        email: email.clone(),
        password_hash: Some(password_hash),
        created_at: now,
    };

    store.create_user(&user)?;
    store.create_profile(&Profile {
        user_id: user.id.clone(),
        email: email.clone(),
        full_name: None,
        role: Role::Admin,
        created_at: now,
        updated_at: now,
    })?;

    println!();
    println!("Created admin user '{email}'.");
    println!();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("chronicle=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init {
                data_dir,
                non_interactive,
            } => {
                run_init(data_dir, non_interactive)?;
            }
        },
        Commands::Serve {
            host,
            port,
            data_dir,
            public_base_url,
        } => {
            let config = ServerConfig {
                host,
                port,
                data_dir: data_dir.into(),
                public_base_url,
            };

            let store = SqliteStore::new(config.db_path())?;
            store.initialize()?;
            if !store.has_service_token()? {
                bail!(
                    "Server not initialized. Run 'chronicle admin init' first to create the database and service token."
                );
            }

            let token_file = config.data_dir.join(".service_token");
            if token_file.exists() {
                info!("Service token available at {}", token_file.display());
            }

            let events = AuthEvents::new();

            // The composition root owns the single auth-event subscription;
            // it is torn down after the server stops.
            let mut event_rx = events.subscribe();
            let event_logger = tokio::spawn(async move {
                while let Ok(event) = event_rx.recv().await {
                    info!("auth event: {event:?}");
                }
            });

            let state = Arc::new(AppState::new(
                Arc::new(store),
                Arc::new(LogMailer),
                events,
                Some(config.base_url()),
            ));

            let app = create_router(state);
            let addr = config.socket_addr()?;

            info!("Starting server on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            event_logger.abort();
        }
    }

    Ok(())
}
