//! API Response types and error codes
//!
//! - `ApiResponse<T>`: Unified response wrapper
//! - `ApiError`: error response carrying its HTTP status
//! - `error_codes`: Standard error code constants

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::ledger::{ErrorKind, LedgerError};
use crate::user_auth::UserError;

// ============================================================================
// Unified API Response Format
// ============================================================================

/// Unified API response wrapper
///
/// All API responses follow this structure:
/// - code: 0 = success, non-zero = error code
/// - msg: short message description
/// - data: actual data (success) or null (error)
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response code: 0 for success, non-zero for errors
    #[schema(example = 0)]
    pub code: i32,
    /// Response message
    #[schema(example = "ok")]
    pub msg: String,
    /// Response data (only present when code == 0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Create success response
    pub fn success(data: T) -> Self {
        Self {
            code: error_codes::SUCCESS,
            msg: "ok".to_string(),
            data: Some(data),
        }
    }

    /// Create error response
    pub fn error(code: i32, msg: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            code,
            msg: msg.into(),
            data: None,
        }
    }
}

pub type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

/// 200 OK with `data`
pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok((StatusCode::OK, Json(ApiResponse::success(data))))
}

/// 201 Created with `data`
pub fn created<T>(data: T) -> ApiResult<T> {
    Ok((StatusCode::CREATED, Json(ApiResponse::success(data))))
}

// ============================================================================
// Errors
// ============================================================================

/// Error response: HTTP status plus the envelope's code and message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: i32,
    pub msg: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: i32, msg: impl Into<String>) -> Self {
        Self {
            status,
            code,
            msg: msg.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error_codes::INVALID_PARAMETER, msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, error_codes::AUTH_FAILED, msg)
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, error_codes::FORBIDDEN, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            error_codes::INTERNAL_ERROR,
            msg,
        )
    }

    pub fn into_err<T>(self) -> Result<T, ApiError> {
        Err(self)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ApiResponse::<()>::error(self.code, self.msg));
        (self.status, body).into_response()
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        let (status, code) = match err.kind() {
            ErrorKind::NotFound => (StatusCode::NOT_FOUND, error_codes::NOT_FOUND),
            ErrorKind::InvalidArgument => (StatusCode::BAD_REQUEST, error_codes::INVALID_PARAMETER),
            ErrorKind::Conflict => (StatusCode::CONFLICT, error_codes::CONFLICT),
            ErrorKind::Unavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                error_codes::SERVICE_UNAVAILABLE,
            ),
            ErrorKind::Cancelled => (StatusCode::GATEWAY_TIMEOUT, error_codes::TIMEOUT),
            ErrorKind::Internal => {
                tracing::error!(error = %err, "Ledger internal error");
                return ApiError::internal("internal error");
            }
        };
        ApiError::new(status, code, err.to_string())
    }
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        let code = match &err {
            UserError::NotFound(_) => error_codes::NOT_FOUND,
            UserError::AlreadyExists(_) => error_codes::FORBIDDEN,
            UserError::InvalidToken => error_codes::AUTH_FAILED,
            UserError::ServiceUnavailable(_) => error_codes::SERVICE_UNAVAILABLE,
            UserError::DatabaseError(_) | UserError::Internal(_) => {
                tracing::error!(error = %err, kind = err.code(), "User service error");
                return ApiError::internal("internal error");
            }
        };
        let status =
            StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        tracing::debug!(kind = err.code(), %status, "User request rejected");
        ApiError::new(status, code, err.to_string())
    }
}

// ============================================================================
// Error Codes
// ============================================================================

/// Standard API error codes
pub mod error_codes {
    // Success
    pub const SUCCESS: i32 = 0;

    // Client errors (1xxx)
    pub const INVALID_PARAMETER: i32 = 1001;
    pub const CURRENCY_MISMATCH: i32 = 1002;

    // Auth errors (2xxx)
    pub const MISSING_AUTH: i32 = 2001;
    pub const AUTH_FAILED: i32 = 2002;
    pub const FORBIDDEN: i32 = 2003;

    // Resource errors (4xxx)
    pub const NOT_FOUND: i32 = 4004;
    pub const CONFLICT: i32 = 4009;

    // Server errors (5xxx)
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const SERVICE_UNAVAILABLE: i32 = 5001;
    pub const TIMEOUT: i32 = 5004;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_error_status_mapping() {
        let cases = [
            (LedgerError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (LedgerError::InvalidArgument("x".into()), StatusCode::BAD_REQUEST),
            (LedgerError::Conflict("x".into()), StatusCode::CONFLICT),
            (LedgerError::Unavailable("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (LedgerError::Cancelled("x".into()), StatusCode::GATEWAY_TIMEOUT),
            (LedgerError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn test_internal_details_not_exposed() {
        let err = ApiError::from(LedgerError::Internal("relation \"accounts\" missing".into()));
        assert_eq!(err.msg, "internal error");
        assert_eq!(err.code, error_codes::INTERNAL_ERROR);
    }

    #[test]
    fn test_error_envelope_omits_data() {
        let json = serde_json::to_value(ApiResponse::<()>::error(
            error_codes::NOT_FOUND,
            "account 3 not found",
        ))
        .unwrap();
        assert_eq!(json["code"], 4004);
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_user_error_mapping() {
        let err = ApiError::from(UserError::AlreadyExists("alice".into()));
        assert_eq!(err.status, StatusCode::FORBIDDEN);
        assert_eq!(err.code, error_codes::FORBIDDEN);

        let err = ApiError::from(UserError::InvalidToken);
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);

        let err = ApiError::from(UserError::DatabaseError("connection refused".into()));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.msg, "internal error");
    }
}
