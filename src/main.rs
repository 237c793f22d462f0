use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use veterans_portal::{
    AppState,
    auth::{self, ROLE_ADMIN},
    config::{AppConfig, Env},
    create_router,
    repository::{PostgresRepository, Repository, RepositoryState},
    revocation::{PostgresRevocationStore, RevocationState},
    storage::{S3StorageClient, StorageService, StorageState},
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// main
///
/// Loads configuration, initialises logging, database, storage and the HTTP server.
/// Any startup failure is logged and ends the process with a non-zero status.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    dotenv::dotenv().ok();
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    // 2. Logging. RUST_LOG wins over the defaults.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "veterans_portal=debug,tower_http=info,axum=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // JSON lines for the log aggregator.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "startup failed");
        std::process::exit(1);
    }
}

async fn run(config: AppConfig) -> Result<(), BoxError> {
    tracing::info!("Application starting in {:?} mode", config.env);

    // 3. Database: pool plus schema migrations.
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .map_err(|e| format!("failed to connect to Postgres, check DATABASE_URL: {e}"))?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let repo = Arc::new(PostgresRepository::new(pool.clone())) as RepositoryState;
    let revocation = Arc::new(PostgresRevocationStore::new(pool)) as RevocationState;

    bootstrap_admin(&config, repo.as_ref()).await?;

    // 4. Storage (S3/MinIO)
    let s3_client = S3StorageClient::new(
        &config.s3_endpoint,
        &config.s3_region,
        &config.s3_key,
        &config.s3_secret,
        &config.s3_bucket,
    )
    .await;

    // Local MinIO starts without a bucket.
    if config.env == Env::Local {
        s3_client.ensure_bucket_exists().await;
    }

    let storage = Arc::new(s3_client) as StorageState;

    // 5. Unified State Assembly
    let bind_addr = config.bind_addr.clone();
    let app_state = AppState {
        repo,
        revocation,
        storage,
        config,
    };

    let app = create_router(app_state);

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("Listening on {bind_addr}");
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Creates the configured administrator account when it does not exist yet.
async fn bootstrap_admin(config: &AppConfig, repo: &dyn Repository) -> Result<(), BoxError> {
    let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) else {
        return Ok(());
    };

    if repo.get_user_by_username(username).await?.is_some() {
        tracing::debug!(%username, "bootstrap admin already present");
        return Ok(());
    }

    let hash = auth::hash_password(password)?;
    let user = repo.create_user(username, &hash, ROLE_ADMIN).await?;
    tracing::info!(user_id = user.id, %username, "bootstrap admin created");
    Ok(())
}
