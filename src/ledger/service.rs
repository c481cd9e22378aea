//! Ledger facade used by the gateway and the binary.
//!
//! Wraps a [`LedgerStore`] so that single-statement operations each run in
//! their own unit of work, and transfers go through the coordinator.

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::time::Instant;
use tracing::debug;

use super::coordinator::TransferCoordinator;
use super::error::LedgerError;
use super::models::{
    Account, CreateAccountParams, Entry, ListAccountsParams, ListEntriesParams,
    ListTransfersParams, Transfer, TransferParams, TransferResult,
};
use super::store::{
    AccountRepository, EntryRepository, LedgerStore, TransferRepository, UnitOfWork,
};

#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn LedgerStore>,
    coordinator: TransferCoordinator,
}

impl Ledger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        let coordinator = TransferCoordinator::new(Arc::clone(&store));
        Self { store, coordinator }
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    pub fn coordinator(&self) -> &TransferCoordinator {
        &self.coordinator
    }

    /// Run `f` inside a fresh unit of work.
    ///
    /// Commits when `f` returns `Ok`, rolls back otherwise.
    pub async fn in_unit_of_work<T, F>(&self, f: F) -> Result<T, LedgerError>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut dyn UnitOfWork) -> BoxFuture<'c, Result<T, LedgerError>> + Send,
    {
        let mut uow = self.store.begin().await?;
        match f(uow.as_mut()).await {
            Ok(value) => {
                uow.commit().await?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rb) = uow.rollback().await {
                    debug!(error = %rb, "Rollback failed after error");
                }
                Err(e)
            }
        }
    }

    pub async fn create_account(&self, params: CreateAccountParams) -> Result<Account, LedgerError> {
        self.in_unit_of_work(|uow| Box::pin(async move { uow.create_account(params).await }))
            .await
    }

    pub async fn get_account(&self, id: i64) -> Result<Account, LedgerError> {
        self.in_unit_of_work(|uow| Box::pin(async move { uow.get_account(id).await }))
            .await
    }

    pub async fn list_accounts(
        &self,
        params: ListAccountsParams,
    ) -> Result<Vec<Account>, LedgerError> {
        self.in_unit_of_work(|uow| Box::pin(async move { uow.list_accounts(params).await }))
            .await
    }

    pub async fn set_account_balance(&self, id: i64, balance: i64) -> Result<Account, LedgerError> {
        self.in_unit_of_work(|uow| {
            Box::pin(async move { uow.set_account_balance(id, balance).await })
        })
        .await
    }

    /// Fails with `Conflict` while entries or transfers still reference the account.
    pub async fn delete_account(&self, id: i64) -> Result<(), LedgerError> {
        self.in_unit_of_work(|uow| Box::pin(async move { uow.delete_account(id).await }))
            .await
    }

    pub async fn get_entry(&self, id: i64) -> Result<Entry, LedgerError> {
        self.in_unit_of_work(|uow| Box::pin(async move { uow.get_entry(id).await }))
            .await
    }

    pub async fn list_entries(&self, params: ListEntriesParams) -> Result<Vec<Entry>, LedgerError> {
        self.in_unit_of_work(|uow| Box::pin(async move { uow.list_entries(params).await }))
            .await
    }

    pub async fn get_transfer(&self, id: i64) -> Result<Transfer, LedgerError> {
        self.in_unit_of_work(|uow| Box::pin(async move { uow.get_transfer(id).await }))
            .await
    }

    pub async fn list_transfers(
        &self,
        params: ListTransfersParams,
    ) -> Result<Vec<Transfer>, LedgerError> {
        self.in_unit_of_work(|uow| Box::pin(async move { uow.list_transfers(params).await }))
            .await
    }

    pub async fn transfer(&self, params: TransferParams) -> Result<TransferResult, LedgerError> {
        self.coordinator.execute_transfer(params).await
    }

    pub async fn transfer_with_deadline(
        &self,
        params: TransferParams,
        deadline: Instant,
    ) -> Result<TransferResult, LedgerError> {
        self.coordinator
            .execute_transfer_with_deadline(params, deadline)
            .await
    }

    pub async fn health_check(&self) -> Result<(), LedgerError> {
        self.store.health_check().await
    }
}
