//! Invigil API server entry point.

use std::error::Error;
use std::sync::Arc;

use invigil_api::config::AppConfig;
use invigil_api::notifier::TracingNotifier;
use invigil_api::routes;
use invigil_api::state::AppState;
use invigil_api::telemetry;
use invigil_core::clock::SystemClock;
use invigil_core::notify::TrackingLinks;
use invigil_resolution::application::scheduler::run_schedule;
use sqlx::postgres::PgPoolOptions;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = AppConfig::from_env()?;
    let telemetry = telemetry::init(config.otlp_endpoint.as_deref())?;

    tracing::info!("Starting Invigil API server");

    // Create database connection pool and bring the schema up to date.
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("../../migrations").run(&pool).await?;

    let app_state = AppState::postgres(
        pool,
        Arc::new(SystemClock),
        Arc::new(TracingNotifier),
        TrackingLinks::new(config.tracking_base_url.clone()),
        config.sweep_policy(),
    );

    let sweeps = config.sweeps_enabled.then(|| {
        let runtime = Arc::new(app_state.sweep_runtime());
        tokio::spawn(run_schedule(runtime, config.sweep_schedule.clone()))
    });

    let app = routes::api_router()
        .layer(TraceLayer::new_for_http())
        .layer(config.cors_layer()?)
        .with_state(app_state);

    let addr = config.bind_addr()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(error) = tokio::signal::ctrl_c().await {
                tracing::error!(%error, "failed to listen for shutdown signal");
            }
        })
        .await?;

    if let Some(handle) = sweeps {
        handle.abort();
    }
    tracing::info!("Invigil API server stopped");
    telemetry.shutdown();

    Ok(())
}
