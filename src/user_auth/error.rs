//! User Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UserError {
    /// Unknown user, or a password that does not match
    #[error("User not found: {0}")]
    NotFound(String),

    #[error("User already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl UserError {
    /// Get the error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            UserError::NotFound(_) => "USER_NOT_FOUND",
            UserError::AlreadyExists(_) => "USER_ALREADY_EXISTS",
            UserError::InvalidToken => "INVALID_TOKEN",
            UserError::DatabaseError(_) => "DATABASE_ERROR",
            UserError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            UserError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            UserError::NotFound(_) => 404,
            UserError::AlreadyExists(_) => 403,
            UserError::InvalidToken => 401,
            UserError::ServiceUnavailable(_) => 503,
            UserError::DatabaseError(_) | UserError::Internal(_) => 500,
        }
    }
}

impl From<sqlx::Error> for UserError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => UserError::NotFound("row not found".to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                UserError::AlreadyExists(db.message().to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                UserError::ServiceUnavailable(e.to_string())
            }
            other => UserError::DatabaseError(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(UserError::InvalidToken.code(), "INVALID_TOKEN");
        assert_eq!(
            UserError::AlreadyExists("bob".into()).code(),
            "USER_ALREADY_EXISTS"
        );
    }

    #[test]
    fn test_http_status() {
        assert_eq!(UserError::NotFound("x".into()).http_status(), 404);
        assert_eq!(UserError::AlreadyExists("x".into()).http_status(), 403);
        assert_eq!(UserError::InvalidToken.http_status(), 401);
        assert_eq!(UserError::Internal("x".into()).http_status(), 500);
    }

    #[test]
    fn test_sqlx_mapping() {
        let err: UserError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, UserError::NotFound(_)));
        let err: UserError = sqlx::Error::PoolTimedOut.into();
        assert_eq!(err.http_status(), 503);
    }
}
