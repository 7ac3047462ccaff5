//! ProControl API Gateway
//!
//! The main entry point for all external API requests.
//! Handles:
//! - Principal extraction
//! - Rate limiting
//! - Request routing
//! - Observability (logging, metrics)

mod handlers;
mod middleware;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use procontrol_common::{config::AppConfig, db::DbPool, metrics};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub metrics_handle: PrometheusHandle,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load()?;
    let config = Arc::new(config);

    // Initialize tracing
    let log_level: tracing::Level = config
        .observability
        .log_level
        .parse()
        .unwrap_or(tracing::Level::INFO);
    if config.observability.json_logging {
        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_target(true)
            .init();
    }

    info!("Starting ProControl API Gateway v{}", procontrol_common::VERSION);

    // Initialize metrics
    let metrics_handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            metrics::LATENCY_BUCKETS,
        )?
        .install_recorder()?;
    metrics::register_metrics();

    // Initialize database connection
    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;

    // Create app state
    let state = AppState {
        config: config.clone(),
        db,
        metrics_handle,
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // API routes
    let api_routes = Router::new()
        // Health endpoints (no auth)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        // Case record endpoints
        .route("/cases/query", post(handlers::cases::query_cases))
        .route("/cases", post(handlers::cases::save_case))
        .route("/cases/{id}", delete(handlers::cases::delete_case))
        .route("/cases/bulk-update", post(handlers::cases::bulk_update))
        .route("/cases/distinct/{column}", get(handlers::cases::distinct_values))
        .route("/cases/flows/{number}", get(handlers::cases::case_history))
        .route("/cases/flows/{number}", delete(handlers::cases::delete_flow))
        .route(
            "/cases/flows/{number}/latest",
            delete(handlers::cases::delete_latest_movement),
        )
        // Account report endpoints
        .route("/reports", get(handlers::reports::list_reports))
        .route("/reports", post(handlers::reports::create_report))
        .route("/reports/{id}", put(handlers::reports::update_report))
        .route("/reports/{id}", delete(handlers::reports::delete_report))
        .route("/reports/{id}/audit", get(handlers::reports::report_audit))
        .route(
            "/reports/process/{number}/audit",
            get(handlers::reports::process_audit),
        )
        // Audit ledger endpoints
        .route("/audit/{id}", delete(handlers::audit::delete_entry));

    // Rate limiting
    let rate_limiter = middleware::rate_limit::create_rate_limiter(
        state.config.rate_limit.requests_per_second,
        state.config.rate_limit.burst,
    );
    let rate_limit_enabled = state.config.rate_limit.enabled;

    // Compose the app
    let mut app = Router::new()
        .nest("/v1", api_routes)
        .route("/metrics", get(handlers::health::metrics))
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(
            middleware::request_metrics::track_requests,
        ))
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state);

    if rate_limit_enabled {
        app = app.layer(axum::middleware::from_fn(move |request, next| {
            let limiter = rate_limiter.clone();
            async move { middleware::rate_limit::rate_limit_middleware(request, next, limiter).await }
        }));
    }

    app
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
