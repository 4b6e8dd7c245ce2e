//! Timecard - Multi-tenant Time-Accounting Service
//! Mission: Authenticated start/stop work timers with admin statistics

use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use std::{env, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use timecard_backend::{
    api::{create_router, AppState},
    auth::{AuthState, JwtHandler, UserStore},
    store::Database,
};

#[derive(Debug, Parser)]
#[command(name = "timecard", about = "Time-accounting service")]
struct Cli {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,

    /// Path to the domain record database
    #[arg(long, env = "DATABASE_PATH", default_value = "./timecard.db")]
    database_path: String,

    /// Path to the user account database
    #[arg(long, env = "AUTH_DB_PATH", default_value = "./timecard_auth.db")]
    auth_db_path: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment and logging
    dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    info!("Timecard service starting");

    let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
        warn!("JWT_SECRET not set, using development default");
        "dev-secret-change-in-production-minimum-32-characters".to_string()
    });

    let user_store = Arc::new(UserStore::new(&cli.auth_db_path)?);
    let jwt_handler = Arc::new(JwtHandler::new(jwt_secret));
    let auth_state = AuthState::new(user_store, jwt_handler);

    info!("Authentication initialized at: {}", cli.auth_db_path);

    let db = Arc::new(Database::open(&cli.database_path)?);

    let app = create_router(AppState {
        db,
        auth: auth_state,
    });

    let addr = format!("0.0.0.0:{}", cli.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("API server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

/// Initialize tracing with env-filter overrides
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "timecard_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
