//! Router setup with all API routes and middleware.

use std::future::Future;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use sym_core::config::SymConfig;
use sym_core::error::SymError;

use crate::handlers;
use crate::state::AppState;

/// JSON bodies are small; audio routes get the configured upload limit.
const JSON_BODY_LIMIT: usize = 64 * 1024;

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
}

/// Create the axum Router with all routes and middleware.
///
/// Every path is also served with a trailing slash, since existing
/// clients call both forms.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.api.allowed_origins);
    let upload_limit = state.config.api.max_upload_bytes;

    let audio_routes = Router::new()
        .route("/upload-audio", post(handlers::upload_audio))
        .route("/upload-audio/", post(handlers::upload_audio))
        .route("/analyze-audio", post(handlers::analyze_audio))
        .route("/analyze-audio/", post(handlers::analyze_audio))
        .layer(DefaultBodyLimit::max(upload_limit));

    let json_routes = Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/analyze-sentiment", post(handlers::analyze_sentiment))
        .route("/analyze-sentiment/", post(handlers::analyze_sentiment))
        .route("/update-user-details", post(handlers::update_user_details))
        .route("/update-user-details/", post(handlers::update_user_details))
        .route("/api/generate-report", post(handlers::generate_report))
        .route("/api/generate-report/", post(handlers::generate_report))
        .route(
            "/api/dashboard/comments-by-unit",
            get(handlers::comments_by_unit),
        )
        .route(
            "/api/dashboard/sentiment-by-unit",
            get(handlers::sentiment_by_unit),
        )
        .route(
            "/api/dashboard/sentiment-trend",
            get(handlers::sentiment_trend),
        )
        .layer(DefaultBodyLimit::max(JSON_BODY_LIMIT));

    audio_routes
        .merge(json_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server on the configured address and serve until
/// `shutdown` resolves.
pub async fn start_server(
    config: &SymConfig,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), SymError> {
    let addr = format!("{}:{}", config.general.bind_address, config.general.port);
    let router = create_router(state);

    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| SymError::Api(format!("Failed to bind {}: {}", addr, e)))?;

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| SymError::Api(format!("Server error: {}", e)))?;

    info!("API server stopped");
    Ok(())
}
