//! Gateway types module
//!
//! ## Input Types
//! - [`ValidatedJson`] / [`ValidatedQuery`]: Axum extractors that run
//!   `validator` rules before the handler sees the request
//! - Request DTOs for users, accounts, transfers and paging
//!
//! ## Output Types
//! - [`ApiResponse<T>`]: Unified API response wrapper
//! - [`ApiError`]: Error response with HTTP status

pub mod request;
pub mod response;

pub use request::{
    CreateAccountRequest, CreateUserRequest, LoginUserRequest, PageQuery, TransferRequest,
    UpdateUserRequest, ValidatedJson, ValidatedQuery,
};
pub use response::{ApiError, ApiResponse, ApiResult, created, error_codes, ok};
