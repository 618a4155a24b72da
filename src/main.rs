use dotenvy::dotenv;
use iris_clinic::{
    api::{self, AppState},
    config::{self, server::ServerConfig},
    core::{branch, notify::Notifier, staff},
    errors::Result,
};
use std::path::Path;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Creates the parent directory of a file-backed `SQLite` URL.
fn ensure_sqlite_dir(database_url: &str) -> Result<()> {
    let Some(rest) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let file = rest.split('?').next().unwrap_or(rest);
    if let Some(parent) = Path::new(file).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, non-fatal since variables can be set externally
    dotenv().ok();

    // 3. Server and clinic configuration
    let server = ServerConfig::from_env();
    let clinic = config::clinic::load_config_or_default(&server.clinic_config_path)
        .inspect_err(|e| error!("Failed to load clinic configuration: {}", e))?;
    info!(clinic = %clinic.clinic_name, "Loaded clinic configuration");

    // 4. Database
    ensure_sqlite_dir(&config::database::get_database_url())?;
    let db = config::database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    config::database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Seed branches and bootstrap staff
    let branches = branch::seed_branches(&db, &clinic.branches).await?;
    let accounts = staff::seed_staff(&db, &clinic.staff).await?;
    info!(branches, accounts, "Seeded reference data");

    // 6. Serve
    let state = AppState::new(db, Notifier::logging(&clinic.clinic_name));
    let app = api::build_router(state);
    let listener = tokio::net::TcpListener::bind(&server.bind_address).await?;
    info!("Listening on {}", server.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
