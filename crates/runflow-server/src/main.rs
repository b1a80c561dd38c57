use axum::Router;
use tower_http::trace::TraceLayer;

use runflow::config::Config;
use runflow::db;
use runflow_server::api;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cfg = Config::from_env()?;

    let pool = db::make_pool(&cfg.database_url).await?;
    if cfg.migrate_on_startup {
        db::run_migrations(&pool).await?;
    }

    let state = api::AppState {
        pool,
        min_lease: cfg.min_run_lease_duration,
        max_lease: cfg.max_run_lease_duration,
    };

    let app: Router = api::router(state).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!(addr = %cfg.bind_addr, "runflowd listening");
    axum::serve(listener, app).await?;

    Ok(())
}
