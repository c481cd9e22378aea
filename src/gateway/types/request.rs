//! Request DTOs and validating extractors
//!
//! Handlers never see a request that failed deserialization or field
//! validation; both are rejected here with `400 INVALID_PARAMETER`.

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
};
use serde::{Deserialize, de::DeserializeOwned};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use super::response::ApiError;
use crate::ledger::Currency;

// ============================================================================
// Field rules
// ============================================================================

fn validate_username(value: &str) -> Result<(), ValidationError> {
    if value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        Ok(())
    } else {
        Err(ValidationError::new("username")
            .with_message("must contain only lowercase letters, digits, or underscore".into()))
    }
}

fn validate_full_name(value: &str) -> Result<(), ValidationError> {
    if value.chars().all(|c| c.is_alphabetic() || c == ' ') {
        Ok(())
    } else {
        Err(ValidationError::new("full_name")
            .with_message("must contain only letters or spaces".into()))
    }
}

fn validate_currency(value: &str) -> Result<(), ValidationError> {
    if Currency::is_supported(value) {
        Ok(())
    } else {
        Err(ValidationError::new("currency").with_message("unsupported currency".into()))
    }
}

// ============================================================================
// Users
// ============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(length(min = 3, max = 100), custom(function = "validate_username"))]
    #[schema(example = "alice")]
    pub username: String,
    #[validate(length(min = 6, max = 100))]
    #[schema(example = "secret123")]
    pub password: String,
    #[validate(length(min = 3, max = 100), custom(function = "validate_full_name"))]
    #[schema(example = "Alice Smith")]
    pub full_name: String,
    #[validate(email, length(min = 3, max = 200))]
    #[schema(example = "alice@example.com")]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginUserRequest {
    #[validate(length(min = 3, max = 100), custom(function = "validate_username"))]
    #[schema(example = "alice")]
    pub username: String,
    #[validate(length(min = 6, max = 100))]
    #[schema(example = "secret123")]
    pub password: String,
}

/// Partial update; omitted fields keep their stored value.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(length(min = 3, max = 100), custom(function = "validate_full_name"))]
    pub full_name: Option<String>,
    #[validate(email, length(min = 3, max = 200))]
    pub email: Option<String>,
    #[validate(length(min = 6, max = 100))]
    pub password: Option<String>,
}

// ============================================================================
// Accounts & transfers
// ============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateAccountRequest {
    #[validate(custom(function = "validate_currency"))]
    #[schema(example = "USD")]
    pub currency: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TransferRequest {
    #[validate(range(min = 1))]
    pub from_account_id: i64,
    #[validate(range(min = 1))]
    pub to_account_id: i64,
    /// Minor currency units
    #[validate(range(min = 1))]
    #[schema(example = 1000)]
    pub amount: i64,
    #[validate(custom(function = "validate_currency"))]
    #[schema(example = "USD")]
    pub currency: String,
}

/// Page selector for list endpoints
#[derive(Debug, Clone, Copy, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// 1-based page number. Capped so the offset cannot overflow.
    #[validate(range(min = 1, max = 1_000_000))]
    pub page_id: i64,
    #[validate(range(min = 5, max = 10))]
    pub page_size: i64,
}

impl PageQuery {
    pub fn limit(&self) -> i64 {
        self.page_size
    }

    pub fn offset(&self) -> i64 {
        (self.page_id - 1) * self.page_size
    }
}

// ============================================================================
// Extractors
// ============================================================================

/// JSON body that passed `validator` checks
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid JSON: {}", e.body_text())))?;
        value
            .validate()
            .map_err(|e| ApiError::bad_request(e.to_string()))?;
        Ok(ValidatedJson(value))
    }
}

/// Query string that passed `validator` checks
#[derive(Debug)]
pub struct ValidatedQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ValidatedQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid query: {}", e.body_text())))?;
        value
            .validate()
            .map_err(|e| ApiError::bad_request(e.to_string()))?;
        Ok(ValidatedQuery(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(username: &str, full_name: &str, email: &str, password: &str) -> CreateUserRequest {
        CreateUserRequest {
            username: username.into(),
            password: password.into(),
            full_name: full_name.into(),
            email: email.into(),
        }
    }

    #[test]
    fn test_create_user_rules() {
        assert!(user("alice_1", "Alice Smith", "a@example.com", "secret").validate().is_ok());
        assert!(user("Alice", "Alice Smith", "a@example.com", "secret").validate().is_err());
        assert!(user("al", "Alice Smith", "a@example.com", "secret").validate().is_err());
        assert!(user("alice", "Alice 2", "a@example.com", "secret").validate().is_err());
        assert!(user("alice", "Alice", "not-an-email", "secret").validate().is_err());
        assert!(user("alice", "Alice", "a@example.com", "short").validate().is_err());
    }

    #[test]
    fn test_update_user_skips_missing_fields() {
        assert!(UpdateUserRequest::default().validate().is_ok());
        let req = UpdateUserRequest {
            email: Some("bad".into()),
            ..Default::default()
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_transfer_request_rules() {
        let mut req = TransferRequest {
            from_account_id: 1,
            to_account_id: 2,
            amount: 10,
            currency: "USD".into(),
        };
        assert!(req.validate().is_ok());
        req.currency = "GBP".into();
        assert!(req.validate().is_err());
        req.currency = "EUR".into();
        req.amount = -1;
        assert!(req.validate().is_err());
    }

    const MAX_PAGE_ID: i64 = 1_000_000;

    #[test]
    fn test_page_bounds_and_offset() {
        let page = PageQuery {
            page_id: 3,
            page_size: 5,
        };
        assert!(page.validate().is_ok());
        assert_eq!(page.offset(), 10);
        assert_eq!(page.limit(), 5);

        assert!(PageQuery { page_id: 0, page_size: 5 }.validate().is_err());
        assert!(
            PageQuery { page_id: MAX_PAGE_ID + 1, page_size: 5 }
                .validate()
                .is_err()
        );
        assert!(PageQuery { page_id: i64::MAX, page_size: 10 }.validate().is_err());
        let last = PageQuery { page_id: MAX_PAGE_ID, page_size: 10 };
        assert!(last.validate().is_ok());
        assert_eq!(last.offset(), (MAX_PAGE_ID - 1) * 10);
        assert!(PageQuery { page_id: 1, page_size: 4 }.validate().is_err());
        assert!(PageQuery { page_id: 1, page_size: 11 }.validate().is_err());
    }
}
