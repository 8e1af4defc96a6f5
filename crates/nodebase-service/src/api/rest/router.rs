//! API Router configuration

use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the main router: pages at the root, procedures under `/api/v1`.
pub fn create_router(state: AppState, enable_cors: bool) -> Router {
    let api_routes = Router::new()
        // Health and status
        .route("/health", get(handlers::health_check))
        .route("/status", get(handlers::service_status))
        // Accounts and sessions
        .route("/auth/signup", post(handlers::signup))
        .route("/auth/login", post(handlers::login))
        .route("/auth/logout", post(handlers::logout))
        .route("/auth/session", get(handlers::current_session))
        // Workflows
        .route("/workflows", get(handlers::list_workflows))
        .route("/workflows", post(handlers::create_workflow))
        // AI trigger
        .route("/ai/test", post(handlers::test_ai));

    // Build router with middleware
    let mut app = Router::new()
        .route("/", get(handlers::index))
        .route("/login", get(handlers::login_page))
        .route("/signup", get(handlers::signup_page))
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http());

    if enable_cors {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    app.with_state(state)
}
