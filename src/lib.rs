//! Bank Ledger - accounts, double-entry history and atomic transfers
//!
//! # Modules
//!
//! - [`ledger`] - Accounts, entries, transfers and the transfer coordinator
//! - [`user_auth`] - Users, password hashing and JWT issuance
//! - [`gateway`] - REST API (axum)
//! - [`db`] - PostgreSQL pool and schema
//! - [`config`] - YAML configuration with environment overrides
//! - [`logging`] - tracing subscriber setup

pub mod config;
pub mod db;
pub mod gateway;
pub mod ledger;
pub mod logging;
pub mod user_auth;

// Convenient re-exports at crate root
pub use config::{AppConfig, ConfigError, StoreKind};
pub use ledger::{
    Account, Currency, Entry, Ledger, LedgerError, LedgerStore, MemoryLedger, PgLedger, Transfer,
    TransferCoordinator, TransferParams, TransferResult,
};
pub use user_auth::{UserError, UserService};
