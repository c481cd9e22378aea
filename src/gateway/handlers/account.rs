//! Account handlers: create, read, list, delete, history

use std::sync::Arc;

use axum::{
    Extension,
    extract::{Path, State, rejection::PathRejection},
};

use super::super::state::AppState;
use super::super::types::{
    ApiError, ApiResult, CreateAccountRequest, PageQuery, ValidatedJson, ValidatedQuery, created,
    ok,
};
use crate::ledger::{
    Account, CreateAccountParams, Currency, Entry, ErrorKind, ListAccountsParams,
    ListEntriesParams, ListTransfersParams, Transfer,
};
use crate::user_auth::Claims;

/// Path id must parse and be positive.
pub(super) fn parse_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, ApiError> {
    match path {
        Ok(Path(id)) if id >= 1 => Ok(id),
        Ok(Path(id)) => Err(ApiError::bad_request(format!("invalid id: {}", id))),
        Err(e) => Err(ApiError::bad_request(e.body_text())),
    }
}

/// Load an account and check the caller owns it.
pub(super) async fn owned_account(
    state: &AppState,
    claims: &Claims,
    id: i64,
) -> Result<Account, ApiError> {
    let account = state.ledger.get_account(id).await?;
    if account.owner != claims.sub {
        return Err(ApiError::unauthorized(
            "account doesn't belong to the authenticated user",
        ));
    }
    Ok(account)
}

/// Open an account for the caller with a zero balance
///
/// POST /api/v1/accounts
#[utoipa::path(
    post,
    path = "/api/v1/accounts",
    request_body = CreateAccountRequest,
    responses(
        (status = 201, description = "Account created", body = Account),
        (status = 400, description = "Unsupported currency"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Owner unknown or already has an account in this currency")
    ),
    security(("bearer_auth" = [])),
    tag = "Accounts"
)]
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    ValidatedJson(req): ValidatedJson<CreateAccountRequest>,
) -> ApiResult<Account> {
    let currency: Currency = req.currency.parse()?;

    let result = state
        .ledger
        .create_account(CreateAccountParams {
            owner: claims.sub.clone(),
            balance: 0,
            currency,
        })
        .await;

    match result {
        Ok(account) => {
            tracing::info!(account_id = account.id, owner = %account.owner, %currency, "Account created");
            created(account)
        }
        Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::Conflict) => {
            Err(ApiError::forbidden(e.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /api/v1/accounts/{id}
#[utoipa::path(
    get,
    path = "/api/v1/accounts/{id}",
    params(("id" = i64, Path, description = "Account id")),
    responses(
        (status = 200, description = "Account", body = Account),
        (status = 400, description = "Invalid id"),
        (status = 401, description = "Not the owner"),
        (status = 404, description = "Account not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Accounts"
)]
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Account> {
    let id = parse_id(path)?;
    ok(owned_account(&state, &claims, id).await?)
}

/// List the caller's accounts
///
/// GET /api/v1/accounts?page_id=1&page_size=5
#[utoipa::path(
    get,
    path = "/api/v1/accounts",
    params(PageQuery),
    responses(
        (status = 200, description = "Accounts ordered by id", body = Vec<Account>),
        (status = 400, description = "Invalid paging"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Accounts"
)]
pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    ValidatedQuery(page): ValidatedQuery<PageQuery>,
) -> ApiResult<Vec<Account>> {
    let accounts = state
        .ledger
        .list_accounts(ListAccountsParams {
            owner: Some(claims.sub),
            limit: page.limit(),
            offset: page.offset(),
        })
        .await?;
    ok(accounts)
}

/// Delete an account without history
///
/// DELETE /api/v1/accounts/{id}
#[utoipa::path(
    delete,
    path = "/api/v1/accounts/{id}",
    params(("id" = i64, Path, description = "Account id")),
    responses(
        (status = 200, description = "Account deleted"),
        (status = 400, description = "Invalid id"),
        (status = 401, description = "Not the owner"),
        (status = 404, description = "Account not found"),
        (status = 409, description = "Account still has entries or transfers")
    ),
    security(("bearer_auth" = [])),
    tag = "Accounts"
)]
pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<()> {
    let id = parse_id(path)?;
    owned_account(&state, &claims, id).await?;
    state.ledger.delete_account(id).await?;
    tracing::info!(account_id = id, owner = %claims.sub, "Account deleted");
    ok(())
}

/// GET /api/v1/accounts/{id}/entries
#[utoipa::path(
    get,
    path = "/api/v1/accounts/{id}/entries",
    params(("id" = i64, Path, description = "Account id"), PageQuery),
    responses(
        (status = 200, description = "Entries ordered by id", body = Vec<Entry>),
        (status = 400, description = "Invalid id or paging"),
        (status = 401, description = "Not the owner"),
        (status = 404, description = "Account not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Accounts"
)]
pub async fn list_account_entries(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<i64>, PathRejection>,
    ValidatedQuery(page): ValidatedQuery<PageQuery>,
) -> ApiResult<Vec<Entry>> {
    let id = parse_id(path)?;
    owned_account(&state, &claims, id).await?;
    let entries = state
        .ledger
        .list_entries(ListEntriesParams {
            account_id: id,
            limit: page.limit(),
            offset: page.offset(),
        })
        .await?;
    ok(entries)
}

/// Transfers sent or received by the account
///
/// GET /api/v1/accounts/{id}/transfers
#[utoipa::path(
    get,
    path = "/api/v1/accounts/{id}/transfers",
    params(("id" = i64, Path, description = "Account id"), PageQuery),
    responses(
        (status = 200, description = "Transfers ordered by id", body = Vec<Transfer>),
        (status = 400, description = "Invalid id or paging"),
        (status = 401, description = "Not the owner"),
        (status = 404, description = "Account not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Accounts"
)]
pub async fn list_account_transfers(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<i64>, PathRejection>,
    ValidatedQuery(page): ValidatedQuery<PageQuery>,
) -> ApiResult<Vec<Transfer>> {
    let id = parse_id(path)?;
    owned_account(&state, &claims, id).await?;
    let transfers = state
        .ledger
        .list_transfers(ListTransfersParams {
            from_account_id: id,
            to_account_id: id,
            limit: page.limit(),
            offset: page.offset(),
        })
        .await?;
    ok(transfers)
}
