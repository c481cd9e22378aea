pub mod handlers;
pub mod openapi;
pub mod state;
pub mod types;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, patch, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::GatewayConfig;
use crate::user_auth;
use state::AppState;

/// Build the complete router for `state`
pub fn build_router(state: Arc<AppState>) -> Router {
    // ==========================================================================
    // Public Routes (no auth required)
    // ==========================================================================
    let public_routes = Router::new()
        .route("/api/v1/health", get(handlers::health_check))
        .route("/api/v1/users", post(user_auth::handlers::create_user))
        .route("/api/v1/users/login", post(user_auth::handlers::login_user));

    // ==========================================================================
    // Private Routes (JWT required)
    // ==========================================================================
    let private_routes = Router::new()
        .route(
            "/api/v1/users/{username}",
            patch(user_auth::handlers::update_user),
        )
        .route(
            "/api/v1/accounts",
            post(handlers::create_account).get(handlers::list_accounts),
        )
        .route(
            "/api/v1/accounts/{id}",
            get(handlers::get_account).delete(handlers::delete_account),
        )
        .route(
            "/api/v1/accounts/{id}/entries",
            get(handlers::list_account_entries),
        )
        .route(
            "/api/v1/accounts/{id}/transfers",
            get(handlers::list_account_transfers),
        )
        .route("/api/v1/transfers", post(handlers::create_transfer))
        .route("/api/v1/transfers/{id}", get(handlers::get_transfer))
        .route_layer(from_fn_with_state(
            state.clone(),
            user_auth::middleware::jwt_auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(private_routes)
        .with_state(state)
        // OpenAPI / Swagger UI (stateless, added after with_state)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
}

/// Bind and serve until the server fails.
pub async fn run_server(config: &GatewayConfig, state: Arc<AppState>) -> std::io::Result<()> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        tracing::error!(
            "Failed to bind to {}: {} (port {} may already be in use)",
            addr,
            e,
            config.port
        );
        e
    })?;

    tracing::info!("Gateway listening on http://{}", addr);
    tracing::info!("API Docs: http://{}/docs", addr);

    axum::serve(listener, app).await
}
