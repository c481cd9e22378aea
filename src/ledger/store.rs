//! Ledger Store boundary
//!
//! A store hands out units of work. Every repository call happens inside a
//! unit of work; nothing becomes visible to other units of work until
//! `commit` returns. Dropping a unit of work without committing rolls it back.

use async_trait::async_trait;

use super::error::LedgerError;
use super::models::{
    Account, CreateAccountParams, CreateEntryParams, CreateTransferParams, Entry,
    ListAccountsParams, ListEntriesParams, ListTransfersParams, Transfer,
};

#[async_trait]
pub trait AccountRepository: Send {
    async fn create_account(&mut self, params: CreateAccountParams)
    -> Result<Account, LedgerError>;

    async fn get_account(&mut self, id: i64) -> Result<Account, LedgerError>;

    /// Ordered by id ascending.
    async fn list_accounts(
        &mut self,
        params: ListAccountsParams,
    ) -> Result<Vec<Account>, LedgerError>;

    /// Add `delta` to the balance under the row lock and return the updated
    /// row. The lock is held until the unit of work ends.
    async fn add_account_balance(&mut self, id: i64, delta: i64) -> Result<Account, LedgerError>;

    /// Administrative overwrite of the balance. Takes the same row lock as
    /// `add_account_balance`.
    async fn set_account_balance(&mut self, id: i64, balance: i64)
    -> Result<Account, LedgerError>;

    async fn delete_account(&mut self, id: i64) -> Result<(), LedgerError>;
}

#[async_trait]
pub trait EntryRepository: Send {
    async fn create_entry(&mut self, params: CreateEntryParams) -> Result<Entry, LedgerError>;

    async fn get_entry(&mut self, id: i64) -> Result<Entry, LedgerError>;

    /// Ordered by id ascending.
    async fn list_entries(&mut self, params: ListEntriesParams)
    -> Result<Vec<Entry>, LedgerError>;
}

#[async_trait]
pub trait TransferRepository: Send {
    async fn create_transfer(
        &mut self,
        params: CreateTransferParams,
    ) -> Result<Transfer, LedgerError>;

    async fn get_transfer(&mut self, id: i64) -> Result<Transfer, LedgerError>;

    /// Ordered by id ascending.
    async fn list_transfers(
        &mut self,
        params: ListTransfersParams,
    ) -> Result<Vec<Transfer>, LedgerError>;
}

/// One atomic unit of work with all repositories bound to it
#[async_trait]
pub trait UnitOfWork: AccountRepository + EntryRepository + TransferRepository + Send {
    async fn commit(self: Box<Self>) -> Result<(), LedgerError>;

    async fn rollback(self: Box<Self>) -> Result<(), LedgerError>;
}

/// Durable ledger storage
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, LedgerError>;

    async fn health_check(&self) -> Result<(), LedgerError>;
}
