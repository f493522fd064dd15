use lotto_portal::{
    AppState, HtmlViews,
    config::{AppConfig, Env},
    create_router,
    repository::{PostgresRepository, RepositoryState},
    views::RendererState,
};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Entry point: configuration, logging, store pool, router, HTTP server.
/// The server runs until the process is terminated.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Configuration (.env first, then the process environment).
    dotenv::dotenv().ok();
    let config = AppConfig::load()?;

    // 2. Logging: RUST_LOG wins, otherwise sensible local defaults.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "lotto_portal=debug,tower_http=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 3. Store pool. Connections are opened lazily: an unreachable database is
    // reported here and then only fails the requests that need it.
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
        .connect_lazy_with(config.connect_options()?);

    match pool.acquire().await {
        Ok(_) => {
            tracing::info!("Connected to the database.");
            if config.run_migrations {
                match sqlx::migrate!("./migrations").run(&pool).await {
                    Ok(()) => tracing::info!("Database migrations applied."),
                    Err(e) => tracing::error!("Database migration failed: {}", e),
                }
            }
        }
        Err(e) => tracing::error!("Could not connect to the database: {}", e),
    }

    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;
    let views = Arc::new(HtmlViews) as RendererState;

    // 4. Unified state and router.
    let bind_address = config.bind_address();
    let app = create_router(AppState { repo, views, config });

    // 5. Serve.
    let listener = TcpListener::bind(&bind_address).await?;
    tracing::info!("Listening on {}", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
