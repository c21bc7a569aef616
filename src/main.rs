use axum::{routing::get_service, Router};
use std::{net::SocketAddr, path::Path};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gym_desk::api::middleware::session::{create_session_layer, AppState};
use gym_desk::config::Config;
use gym_desk::db;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gym_desk=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Gym Desk server...");

    let config = Config::from_env()?;
    tracing::info!(
        lapse_after_months = config.policy.lapse_after_months,
        payment_rule = ?config.policy.payment_rule,
        class_assignment = ?config.policy.class_assignment,
        "Configuration loaded"
    );

    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    db::seed::seed_admin(&pool, &config).await?;

    let session_layer = create_session_layer(pool.clone(), config.secure_cookies).await?;
    tracing::info!("Session layer initialized");

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    let state = AppState {
        pool: pool.clone(),
        config,
    };

    // Serve static assets from web/static
    let static_routes = Router::new().nest_service(
        "/static",
        get_service(ServeDir::new(Path::new("web").join("static"))),
    );

    let app = gym_desk::api::router()
        .merge(static_routes)
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, cleaning up...");
}
