//! Health check handler

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{Json, extract::State, http::StatusCode};
use utoipa::ToSchema;

use super::super::state::AppState;
use crate::ledger::LedgerStore;
use super::super::types::{ApiResponse, error_codes};

/// Health check response data
#[derive(serde::Serialize, serde::Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Server timestamp in milliseconds
    #[schema(example = 1703494800000_u64)]
    pub timestamp_ms: u64,
    /// Ledger backend in use
    #[schema(example = "postgres")]
    pub store: String,
    /// Build commit
    #[schema(example = "a1b2c3d")]
    pub version: String,
}

/// Health check endpoint
///
/// - Healthy: 200 OK + {code: 0, data: {timestamp_ms, store, version}}
/// - Unhealthy: 503 Service Unavailable + {code: 5001, msg: "unavailable"}
///
/// Store errors are logged, never returned.
#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses(
        (status = 200, description = "Service healthy", body = HealthResponse, content_type = "application/json"),
        (status = 503, description = "Service unavailable")
    ),
    tag = "System"
)]
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<ApiResponse<HealthResponse>>), (StatusCode, Json<ApiResponse<()>>)> {
    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);

    if let Err(e) = state.ledger.health_check().await {
        tracing::error!("[HEALTH] Ledger store ping failed: {}", e);
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse::<()>::error(
                error_codes::SERVICE_UNAVAILABLE,
                "unavailable",
            )),
        ));
    }

    Ok((
        StatusCode::OK,
        Json(ApiResponse::success(HealthResponse {
            timestamp_ms: now_ms,
            store: state.ledger.store().name().to_string(),
            version: env!("GIT_HASH").to_string(),
        })),
    ))
}
