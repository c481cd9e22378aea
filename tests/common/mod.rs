//! Shared helpers for integration tests
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use argon2::{Algorithm, Argon2, Params, Version};
use rand::Rng;
use rand::distributions::Alphanumeric;

use bank_ledger::ledger::{
    Account, CreateAccountParams, Currency, Ledger, LedgerStore, MemoryLedger,
};
use bank_ledger::user_auth::{MemoryUserRepository, UserRepository, UserService};

pub const JWT_SECRET: &str = "12345678901234567890123456789012";

pub fn random_owner() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(|c| (c as char).to_ascii_lowercase())
        .collect()
}

pub fn random_amount() -> i64 {
    rand::thread_rng().gen_range(1..=1000)
}

pub fn random_currency() -> Currency {
    Currency::ALL[rand::thread_rng().gen_range(0..Currency::ALL.len())]
}

/// Memory-backed ledger plus a handle on the store for faults and audits
pub fn memory_ledger() -> (MemoryLedger, Ledger) {
    let store = MemoryLedger::new();
    let ledger = Ledger::new(Arc::new(store.clone()) as Arc<dyn LedgerStore>);
    (store, ledger)
}

pub async fn open_account(ledger: &Ledger, balance: i64) -> Account {
    ledger
        .create_account(CreateAccountParams {
            owner: random_owner(),
            balance,
            currency: Currency::Usd,
        })
        .await
        .expect("create account")
}

/// Minimum-cost argon2, hashing at full strength makes tests slow
pub fn fast_hasher() -> Argon2<'static> {
    let params = Params::new(Params::MIN_M_COST, Params::MIN_T_COST, 1, None).expect("params");
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
}

/// Memory ledger whose account owners must be registered users, plus the
/// user service over the same repository
pub fn memory_ledger_with_users() -> (MemoryLedger, Ledger, UserService) {
    let users: Arc<dyn UserRepository> = Arc::new(MemoryUserRepository::new());
    let store = MemoryLedger::new().with_users(Arc::clone(&users));
    let ledger = Ledger::new(Arc::new(store.clone()) as Arc<dyn LedgerStore>);
    (store, ledger, user_service_over(users))
}

fn user_service_over(users: Arc<dyn UserRepository>) -> UserService {
    UserService::new(
        users,
        JWT_SECRET.to_string(),
        Duration::from_secs(60),
    )
    .with_hasher(fast_hasher())
}
