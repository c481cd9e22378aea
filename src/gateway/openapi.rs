//! OpenAPI / Swagger UI Documentation
//!
//! - Swagger UI: `http://localhost:8080/docs`
//! - OpenAPI JSON: `http://localhost:8080/api-docs/openapi.json`

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::gateway::handlers::HealthResponse;
use crate::gateway::types::{
    CreateAccountRequest, CreateUserRequest, LoginUserRequest, TransferRequest, UpdateUserRequest,
};
use crate::ledger::{Account, Currency, Entry, Transfer, TransferResult};
use crate::user_auth::{LoginResponse, UserResponse};

/// JWT bearer authentication security scheme
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "Access token from POST /api/v1/users/login: Bearer {token}",
                        ))
                        .build(),
                ),
            );
        }
    }
}

/// Main API Documentation struct
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bank Ledger API",
        version = "1.0.0",
        description = "Accounts, double-entry history and atomic money transfers.",
        license(
            name = "MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::health_check,
        crate::user_auth::handlers::create_user,
        crate::user_auth::handlers::login_user,
        crate::user_auth::handlers::update_user,
        crate::gateway::handlers::create_account,
        crate::gateway::handlers::get_account,
        crate::gateway::handlers::list_accounts,
        crate::gateway::handlers::delete_account,
        crate::gateway::handlers::list_account_entries,
        crate::gateway::handlers::list_account_transfers,
        crate::gateway::handlers::create_transfer,
        crate::gateway::handlers::get_transfer,
    ),
    components(
        schemas(
            HealthResponse,
            Currency,
            Account,
            Entry,
            Transfer,
            TransferResult,
            UserResponse,
            LoginResponse,
            CreateUserRequest,
            LoginUserRequest,
            UpdateUserRequest,
            CreateAccountRequest,
            TransferRequest,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Users", description = "Registration, login and profile"),
        (name = "Accounts", description = "Accounts and their history (auth required)"),
        (name = "Transfers", description = "Money transfers (auth required)"),
        (name = "System", description = "Health checks and system info")
    )
)]
pub struct ApiDoc;
