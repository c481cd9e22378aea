//! Transfer handlers

use std::sync::Arc;

use axum::{
    Extension,
    extract::{Path, State, rejection::PathRejection},
    http::StatusCode,
};
use tokio::time::Instant;

use super::super::state::AppState;
use super::super::types::{ApiError, ApiResult, TransferRequest, ValidatedJson, error_codes, ok};
use super::account::parse_id;
use crate::ledger::{Account, Currency, Transfer, TransferParams, TransferResult};
use crate::user_auth::Claims;

fn check_currency(account: &Account, currency: Currency) -> Result<(), ApiError> {
    if account.currency != currency {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            error_codes::CURRENCY_MISMATCH,
            format!(
                "account [{}] currency mismatch: {} vs {}",
                account.id, account.currency, currency
            ),
        ));
    }
    Ok(())
}

/// Move money between two accounts
///
/// POST /api/v1/transfers
///
/// Checks, in order: the source account exists, uses the request currency
/// and belongs to the caller; then the same for the destination, minus
/// ownership. Nothing about the destination is revealed to a caller who
/// does not own the source. The transfer runs under the configured deadline.
#[utoipa::path(
    post,
    path = "/api/v1/transfers",
    request_body = TransferRequest,
    responses(
        (status = 200, description = "Transfer committed", body = TransferResult),
        (status = 400, description = "Invalid parameters or currency mismatch"),
        (status = 401, description = "Source account not owned by caller"),
        (status = 404, description = "Account not found"),
        (status = 503, description = "Store unavailable, safe to retry"),
        (status = 504, description = "Deadline passed before commit; nothing was applied")
    ),
    security(("bearer_auth" = [])),
    tag = "Transfers"
)]
pub async fn create_transfer(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    ValidatedJson(req): ValidatedJson<TransferRequest>,
) -> ApiResult<TransferResult> {
    let currency: Currency = req.currency.parse()?;

    let from = state.ledger.get_account(req.from_account_id).await?;
    check_currency(&from, currency)?;
    if from.owner != claims.sub {
        tracing::warn!(
            from_account_id = from.id,
            caller = %claims.sub,
            "Transfer from an account the caller does not own"
        );
        return ApiError::unauthorized("from account doesn't belong to the authenticated user")
            .into_err();
    }

    let to = state.ledger.get_account(req.to_account_id).await?;
    check_currency(&to, currency)?;

    let deadline = Instant::now() + state.transfer_timeout;
    let result = state
        .ledger
        .transfer_with_deadline(
            TransferParams::new(req.from_account_id, req.to_account_id, req.amount),
            deadline,
        )
        .await?;
    ok(result)
}

/// Get a transfer the caller sent or received
///
/// GET /api/v1/transfers/{id}
#[utoipa::path(
    get,
    path = "/api/v1/transfers/{id}",
    params(("id" = i64, Path, description = "Transfer id")),
    responses(
        (status = 200, description = "Transfer", body = Transfer),
        (status = 400, description = "Invalid id"),
        (status = 401, description = "Caller is not a party to the transfer"),
        (status = 404, description = "Transfer not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Transfers"
)]
pub async fn get_transfer(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Transfer> {
    let id = parse_id(path)?;
    let transfer = state.ledger.get_transfer(id).await?;

    let from = state.ledger.get_account(transfer.from_account_id).await?;
    let to = state.ledger.get_account(transfer.to_account_id).await?;
    if from.owner != claims.sub && to.owner != claims.sub {
        return ApiError::unauthorized("transfer doesn't involve the authenticated user").into_err();
    }
    ok(transfer)
}
