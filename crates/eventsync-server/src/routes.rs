use axum::{
    http::{header, HeaderName, Method},
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::auth::{self, ADMIN_TOKEN_HEADER};
use crate::handlers;
use crate::AppState;

pub fn api_routes(state: AppState) -> Router<AppState> {
    let admin = Router::new()
        .route("/events/:id", delete(handlers::delete_event))
        .route_layer(middleware::from_fn_with_state(state, auth::require_admin));

    Router::new()
        .route("/events/submit", post(handlers::submit_event))
        .route("/events/upcoming", get(handlers::list_upcoming))
        .route("/events/sync", post(handlers::sync_candidates))
        .route("/assistant/recommend", post(handlers::recommend))
        .merge(admin)
}

pub fn build_app(state: AppState, cors_allowed_origins: Option<&str>) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api", api_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(cors_allowed_origins))
        .with_state(state)
}

/// Serve the static frontend from `frontend_dir` for any non-API path, if
/// the directory exists.
pub fn with_frontend(app: Router, frontend_dir: &str) -> Router {
    if std::path::Path::new(frontend_dir).exists() {
        tracing::info!("Serving frontend from {}", frontend_dir);
        let index_path = format!("{}/index.html", frontend_dir);
        let serve_dir = ServeDir::new(frontend_dir).not_found_service(ServeFile::new(&index_path));
        app.fallback_service(serve_dir)
    } else {
        tracing::info!(
            "Frontend directory not found at {}, serving API only",
            frontend_dir
        );
        app
    }
}

/// CORS for the browser frontend and the admin console.
///
/// `allowed_origins` is the comma-separated CORS_ALLOWED_ORIGINS value.
/// Unset or unparseable falls back to permissive CORS.
fn build_cors_layer(allowed_origins: Option<&str>) -> CorsLayer {
    match allowed_origins {
        Some(origins) => {
            let origins: Vec<_> = origins
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();

            if origins.is_empty() {
                tracing::warn!(
                    "CORS_ALLOWED_ORIGINS is set but empty, using permissive CORS (not recommended for production)"
                );
                CorsLayer::permissive()
            } else {
                tracing::info!("CORS configured for origins: {:?}", origins);
                CorsLayer::new()
                    .allow_origin(AllowOrigin::list(origins))
                    .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
                    .allow_headers([
                        header::CONTENT_TYPE,
                        header::AUTHORIZATION,
                        HeaderName::from_static(ADMIN_TOKEN_HEADER),
                    ])
            }
        }
        None => {
            tracing::warn!(
                "CORS_ALLOWED_ORIGINS not set, using permissive CORS (not recommended for production)"
            );
            CorsLayer::permissive()
        }
    }
}
