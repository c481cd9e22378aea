//! Transfer Coordinator
//!
//! Executes a money transfer as one unit of work:
//!
//! ```text
//! begin ─▶ insert transfer ─▶ debit entry ─▶ credit entry
//!       ─▶ add_balance(min id) ─▶ add_balance(max id) ─▶ commit
//! ```
//!
//! Any failure before commit rolls the whole unit of work back.
//!
//! Balances are updated in ascending account-id order regardless of the
//! transfer direction. Two transfers touching the same pair of accounts
//! therefore take the row locks in the same order and cannot wait on each
//! other in a cycle. The same rule extends to N accounts by sorting ids
//! before locking.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::error::LedgerError;
use super::models::{
    Account, CreateEntryParams, CreateTransferParams, TransferParams, TransferResult,
};
use super::store::{
    AccountRepository, EntryRepository, LedgerStore, TransferRepository, UnitOfWork,
};

/// Tracing target for per-step transfer logs
pub const TRACE_TARGET: &str = "LEDGER_TRACE";

/// Step of the transfer sequence, used to label errors and logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStep {
    Begin,
    InsertTransfer,
    InsertDebitEntry,
    InsertCreditEntry,
    UpdateFirstBalance,
    UpdateSecondBalance,
    Commit,
}

impl TransferStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStep::Begin => "begin",
            TransferStep::InsertTransfer => "insert transfer",
            TransferStep::InsertDebitEntry => "insert debit entry",
            TransferStep::InsertCreditEntry => "insert credit entry",
            TransferStep::UpdateFirstBalance => "update first balance",
            TransferStep::UpdateSecondBalance => "update second balance",
            TransferStep::Commit => "commit",
        }
    }
}

impl fmt::Display for TransferStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accounts in lock order: (smaller id, delta), (larger id, delta)
fn lock_order(params: &TransferParams) -> [(i64, i64); 2] {
    let debit = (params.from_account_id, -params.amount);
    let credit = (params.to_account_id, params.amount);
    if debit.0 < credit.0 {
        [debit, credit]
    } else {
        [credit, debit]
    }
}

/// Transfer Coordinator
///
/// Holds no per-transfer state; share one instance across tasks.
#[derive(Clone)]
pub struct TransferCoordinator {
    store: Arc<dyn LedgerStore>,
}

impl TransferCoordinator {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Move `amount` from one account to another.
    pub async fn execute_transfer(
        &self,
        params: TransferParams,
    ) -> Result<TransferResult, LedgerError> {
        self.execute_transfer_cancellable(params, std::future::pending::<()>())
            .await
    }

    /// As [`execute_transfer`](Self::execute_transfer), rolled back with
    /// `Cancelled` if `deadline` passes before commit.
    pub async fn execute_transfer_with_deadline(
        &self,
        params: TransferParams,
        deadline: Instant,
    ) -> Result<TransferResult, LedgerError> {
        self.execute_transfer_cancellable(params, tokio::time::sleep_until(deadline))
            .await
    }

    /// As [`execute_transfer`](Self::execute_transfer), rolled back with
    /// `Cancelled` if `cancelled` resolves before commit starts.
    ///
    /// Once commit has started the transfer runs to completion and its real
    /// outcome is returned.
    pub async fn execute_transfer_cancellable<C>(
        &self,
        params: TransferParams,
        cancelled: C,
    ) -> Result<TransferResult, LedgerError>
    where
        C: Future<Output = ()> + Send,
    {
        params.validate()?;
        tokio::pin!(cancelled);

        let mut uow = tokio::select! {
            biased;
            _ = &mut cancelled => {
                return Err(LedgerError::Cancelled("transfer cancelled before begin".to_string()));
            }
            uow = self.store.begin() => uow.map_err(|e| {
                warn!(step = %TransferStep::Begin, error = %e, "Transfer could not start");
                e.context(TransferStep::Begin)
            })?,
        };

        let outcome = tokio::select! {
            biased;
            _ = &mut cancelled => Err(LedgerError::Cancelled(
                "transfer cancelled before commit".to_string(),
            )),
            res = Self::apply(uow.as_mut(), &params) => res,
        };

        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                if let Err(rb) = uow.rollback().await {
                    warn!(error = %rb, "Rollback reported an error (unit of work discarded)");
                }
                warn!(
                    from_account_id = params.from_account_id,
                    to_account_id = params.to_account_id,
                    amount = params.amount,
                    error = %e,
                    kind = %e.kind(),
                    "Transfer rolled back"
                );
                return Err(e);
            }
        };

        uow.commit().await.map_err(|e| {
            warn!(
                transfer_id = result.transfer.id,
                step = %TransferStep::Commit,
                error = %e,
                "Transfer commit failed"
            );
            e.context(TransferStep::Commit)
        })?;

        info!(
            transfer_id = result.transfer.id,
            from_account_id = params.from_account_id,
            to_account_id = params.to_account_id,
            amount = params.amount,
            "Transfer committed"
        );
        Ok(result)
    }

    /// Steps 2-5, all inside the open unit of work.
    async fn apply(
        uow: &mut dyn UnitOfWork,
        params: &TransferParams,
    ) -> Result<TransferResult, LedgerError> {
        let transfer = uow
            .create_transfer(CreateTransferParams {
                from_account_id: params.from_account_id,
                to_account_id: params.to_account_id,
                amount: params.amount,
            })
            .await
            .map_err(|e| e.context(TransferStep::InsertTransfer))?;
        debug!(target: TRACE_TARGET, transfer_id = transfer.id, step = %TransferStep::InsertTransfer);

        let from_entry = uow
            .create_entry(CreateEntryParams {
                account_id: params.from_account_id,
                amount: -params.amount,
            })
            .await
            .map_err(|e| e.context(TransferStep::InsertDebitEntry))?;
        debug!(target: TRACE_TARGET, transfer_id = transfer.id, entry_id = from_entry.id, step = %TransferStep::InsertDebitEntry);

        let to_entry = uow
            .create_entry(CreateEntryParams {
                account_id: params.to_account_id,
                amount: params.amount,
            })
            .await
            .map_err(|e| e.context(TransferStep::InsertCreditEntry))?;
        debug!(target: TRACE_TARGET, transfer_id = transfer.id, entry_id = to_entry.id, step = %TransferStep::InsertCreditEntry);

        let [(first_id, first_delta), (second_id, second_delta)] = lock_order(params);

        let first = uow
            .add_account_balance(first_id, first_delta)
            .await
            .map_err(|e| e.context(TransferStep::UpdateFirstBalance))?;
        debug!(target: TRACE_TARGET, transfer_id = transfer.id, account_id = first_id, balance = first.balance, step = %TransferStep::UpdateFirstBalance);

        let second = uow
            .add_account_balance(second_id, second_delta)
            .await
            .map_err(|e| e.context(TransferStep::UpdateSecondBalance))?;
        debug!(target: TRACE_TARGET, transfer_id = transfer.id, account_id = second_id, balance = second.balance, step = %TransferStep::UpdateSecondBalance);

        let (from_account, to_account) = by_role(params, first, second);
        Ok(TransferResult {
            transfer,
            from_account,
            to_account,
            from_entry,
            to_entry,
        })
    }
}

fn by_role(params: &TransferParams, a: Account, b: Account) -> (Account, Account) {
    if a.id == params.from_account_id {
        (a, b)
    } else {
        (b, a)
    }
}
