use axum::{
    Extension,
    extract::{Path, State},
};
use std::sync::Arc;

use super::models::{LoginResponse, UserResponse};
use super::service::{Claims, UserChanges};
use super::UserError;
use crate::gateway::state::AppState;
use crate::gateway::types::{
    ApiError, ApiResponse, ApiResult, CreateUserRequest, LoginUserRequest, UpdateUserRequest,
    ValidatedJson, created, ok,
};

/// Create a new user
///
/// POST /api/v1/users
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Username or email already exists"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Users"
)]
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<CreateUserRequest>,
) -> ApiResult<UserResponse> {
    let user = state
        .users
        .create_user(&req.username, &req.password, &req.full_name, &req.email)
        .await
        .map_err(|e| {
            if matches!(e, UserError::AlreadyExists(_)) {
                tracing::warn!(username = %req.username, "Registration attempt for existing user");
            }
            ApiError::from(e)
        })?;
    created(UserResponse::from(user))
}

/// Login user
///
/// POST /api/v1/users/login
#[utoipa::path(
    post,
    path = "/api/v1/users/login",
    request_body = LoginUserRequest,
    responses(
        (status = 200, description = "Login successful", body = ApiResponse<LoginResponse>),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Users"
)]
pub async fn login_user(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<LoginUserRequest>,
) -> ApiResult<LoginResponse> {
    match state.users.login(&req.username, &req.password).await {
        Ok(resp) => ok(resp),
        Err(UserError::NotFound(_)) => Err(ApiError::unauthorized("Invalid username or password")),
        Err(e) => Err(e.into()),
    }
}

/// Update the caller's own profile
///
/// PATCH /api/v1/users/{username}
#[utoipa::path(
    patch,
    path = "/api/v1/users/{username}",
    params(("username" = String, Path, description = "User to update; must be the caller")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Updating another user"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(username): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateUserRequest>,
) -> ApiResult<UserResponse> {
    if claims.sub != username {
        return Err(ApiError::forbidden("you are not allowed to update this user"));
    }

    let user = state
        .users
        .update_user(
            &username,
            UserChanges {
                full_name: req.full_name,
                email: req.email,
                password: req.password,
            },
        )
        .await?;
    ok(UserResponse::from(user))
}
