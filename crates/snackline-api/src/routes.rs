//! Router setup with all API routes and middleware.
//!
//! Configures the axum Router with CORS, tracing, and the three route
//! groups: public, authenticated, and manager-only.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Create the axum Router with all routes and middleware.
///
/// # Arguments
/// * `state` - The shared application state.
///
/// # Returns
/// A fully configured axum Router ready to serve requests.
pub fn create_router(state: AppState) -> Router {
    // CORS middleware: allow localhost origins for the shop-floor UI.
    let port = state.config.general.port;
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list([
            format!("http://127.0.0.1:{}", port)
                .parse::<HeaderValue>()
                .unwrap(),
            format!("http://localhost:{}", port)
                .parse::<HeaderValue>()
                .unwrap(),
        ]))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    // Routes that do NOT require authentication.
    let public_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/login", post(handlers::login));

    // Any authenticated role may log out and append records.
    let authenticated_routes = Router::new()
        .route("/logout", post(handlers::logout))
        .route("/records/leak", post(handlers::create_leak))
        .route("/records/oxygen", post(handlers::create_oxygen))
        .route("/records/breakage", post(handlers::create_breakage))
        .route("/records/log", post(handlers::create_log))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::auth::require_auth,
        ));

    // Dashboard and exports are manager-only.
    let manager_routes = Router::new()
        .route("/api/dashboard", post(handlers::dashboard_data))
        .route("/api/export", post(handlers::export_filtered))
        .route("/export/leak", get(handlers::export_leak))
        .route("/export/oxygen", get(handlers::export_oxygen))
        .route("/export/breakage", get(handlers::export_breakage))
        .route("/export/log", get(handlers::export_log))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::auth::require_manager,
        ));

    public_routes
        .merge(authenticated_routes)
        .merge(manager_routes)
        .layer(DefaultBodyLimit::max(1024 * 1024)) // 1MB global limit
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server on the configured address.
///
/// Binds to 127.0.0.1 (localhost only) on the port from config.
pub async fn start_server(
    config: &snackline_core::config::SnacklineConfig,
    state: AppState,
) -> Result<(), snackline_core::error::SnacklineError> {
    let addr = format!("127.0.0.1:{}", config.general.port);

    let router = create_router(state);

    tracing::info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| snackline_core::error::SnacklineError::Api(format!("Failed to bind: {}", e)))?;

    axum::serve(listener, router)
        .await
        .map_err(|e| snackline_core::error::SnacklineError::Api(format!("Server error: {}", e)))?;

    Ok(())
}
