//! Double-entry ledger
//!
//! Accounts, entries and transfers behind a unit-of-work store, plus the
//! coordinator that moves money between two accounts atomically.

pub mod coordinator;
pub mod error;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod service;
pub mod store;

pub use coordinator::{TRACE_TARGET, TransferCoordinator, TransferStep};
pub use error::{ErrorKind, LedgerError};
pub use memory::{FaultPoint, LedgerCounts, MemoryLedger};
pub use models::{
    Account, CreateAccountParams, CreateEntryParams, CreateTransferParams, Currency, Entry,
    ListAccountsParams, ListEntriesParams, ListTransfersParams, Transfer, TransferParams,
    TransferResult,
};
pub use postgres::PgLedger;
pub use service::Ledger;
pub use store::{AccountRepository, EntryRepository, LedgerStore, TransferRepository, UnitOfWork};
