mod config;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use tutuca_api::{AppState, AppStateInner};
use tutuca_db::Database;
use tutuca_types::api::{SignUpMetadata, SignUpRequest};
use tutuca_types::models::UserType;

use crate::config::Config;

#[derive(Parser)]
#[command(name = "tutuca", version, about = "Brand and influencer campaign marketplace")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Create an account, as if it had signed up
    CreateUser {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, value_parser = parse_user_type)]
        user_type: UserType,
        #[arg(long)]
        full_name: Option<String>,
        #[arg(long)]
        company_name: Option<String>,
    },
    /// Verify the database opens and the core tables are readable
    Check,
}

fn parse_user_type(value: &str) -> Result<UserType, String> {
    value.parse().map_err(|e| format!("{e}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tutuca=debug,tutuca_api=debug,tutuca_db=info,tower_http=debug".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::CreateUser {
            email,
            password,
            user_type,
            full_name,
            company_name,
        } => {
            let state = open_state(&config)?;
            let session = tutuca_api::auth::register(
                &state,
                SignUpRequest {
                    email,
                    password,
                    data: SignUpMetadata {
                        user_type,
                        full_name,
                        company_name,
                    },
                },
            )
            .await
            .map_err(|e| anyhow::anyhow!("could not create user: {}", e))?;

            let profile = &session.profile;
            info!("Created {} {} ({})", profile.user_type, profile.email, profile.id);
            println!("{}", serde_json::to_string_pretty(profile)?);
            Ok(())
        }
        Command::Check => {
            let db = Database::open(&config.db_path)?;
            for (table, rows) in db.check_tables()? {
                info!("{} readable ({} rows)", table, rows);
            }
            println!("Database at {} is ready", config.db_path.display());
            Ok(())
        }
    }
}

fn open_state(config: &Config) -> anyhow::Result<AppState> {
    let db = Database::open(&config.db_path)?;
    Ok(Arc::new(AppStateInner {
        db,
        jwt_secret: config.jwt_secret.clone(),
        session_ttl: chrono::Duration::days(config.session_days),
    }))
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let state = open_state(&config)?;

    // The browser client talks to the API from its own origin.
    let app = tutuca_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = config.addr()?;
    info!("Tutuca server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                tracing::warn!("Could not install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
