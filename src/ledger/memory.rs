//! In-memory Ledger Store
//!
//! Behaves like a read-committed relational store with row locks:
//! - writes are staged in the unit of work and applied on commit
//! - `add_account_balance`, `set_account_balance` and `delete_account` take a
//!   per-account async lock that is held until the unit of work ends
//! - inserts check referenced accounts (foreign keys) and `(owner, currency)`
//!   uniqueness, again at commit time
//!
//! - with [`MemoryLedger::with_users`], account owners must exist in the
//!   user repository, like the `accounts.owner` foreign key
//!
//! Faults can be armed at named points to exercise rollback paths, and
//! `audit()` checks the ledger and transfer invariants over committed state.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::OwnedMutexGuard;
use tracing::debug;

use super::error::LedgerError;
use super::models::{
    Account, CreateAccountParams, CreateEntryParams, CreateTransferParams, Entry,
    ListAccountsParams, ListEntriesParams, ListTransfersParams, Transfer,
};
use super::store::{AccountRepository, EntryRepository, LedgerStore, TransferRepository, UnitOfWork};
use crate::user_auth::{UserError, UserRepository};

/// Points at which a fault can be injected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    Begin,
    InsertTransfer,
    InsertEntry,
    AddBalance,
    Commit,
}

#[derive(Debug)]
struct Fault {
    point: FaultPoint,
    /// Matching calls to let through before firing
    skip: usize,
    error: LedgerError,
}

#[derive(Debug, Default)]
struct Tables {
    accounts: BTreeMap<i64, Account>,
    entries: BTreeMap<i64, Entry>,
    transfers: BTreeMap<i64, Transfer>,
    /// Balance not explained by entries (opening balance, admin overwrites)
    baseline: HashMap<i64, i64>,
}

struct Inner {
    tables: Mutex<Tables>,
    row_locks: DashMap<i64, Arc<tokio::sync::Mutex<()>>>,
    account_seq: AtomicI64,
    entry_seq: AtomicI64,
    transfer_seq: AtomicI64,
    faults: Mutex<Vec<Fault>>,
    lock_delay_us: AtomicU64,
}

impl Inner {
    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_fault(&self, point: FaultPoint) -> Result<(), LedgerError> {
        let mut faults = self.faults.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(pos) = faults.iter().position(|f| f.point == point) else {
            return Ok(());
        };
        if faults[pos].skip > 0 {
            faults[pos].skip -= 1;
            return Ok(());
        }
        let fault = faults.remove(pos);
        debug!(point = ?point, error = %fault.error, "Injected fault fired");
        Err(fault.error)
    }

    fn lock_delay(&self) -> Duration {
        Duration::from_micros(self.lock_delay_us.load(Ordering::Relaxed))
    }
}

/// Committed row counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LedgerCounts {
    pub accounts: usize,
    pub entries: usize,
    pub transfers: usize,
}

/// In-memory ledger store. Cloning shares the same data.
#[derive(Clone)]
pub struct MemoryLedger {
    inner: Arc<Inner>,
    users: Option<Arc<dyn UserRepository>>,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                tables: Mutex::new(Tables::default()),
                row_locks: DashMap::new(),
                account_seq: AtomicI64::new(1),
                entry_seq: AtomicI64::new(1),
                transfer_seq: AtomicI64::new(1),
                faults: Mutex::new(Vec::new()),
                lock_delay_us: AtomicU64::new(0),
            }),
            users: None,
        }
    }

    /// Reject accounts whose owner is not a user in `users`.
    pub fn with_users(mut self, users: Arc<dyn UserRepository>) -> Self {
        self.users = Some(users);
        self
    }

    /// Fail the next call at `point` with `error`.
    pub fn inject_fault(&self, point: FaultPoint, error: LedgerError) {
        self.inject_fault_after(point, 0, error);
    }

    /// Let `skip` calls at `point` through, then fail the next one.
    pub fn inject_fault_after(&self, point: FaultPoint, skip: usize, error: LedgerError) {
        self.inner
            .faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Fault { point, skip, error });
    }

    /// Sleep this long after every row-lock acquisition. Widens race windows.
    pub fn set_lock_delay(&self, delay: Duration) {
        self.inner
            .lock_delay_us
            .store(delay.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn counts(&self) -> LedgerCounts {
        let tables = self.inner.tables();
        LedgerCounts {
            accounts: tables.accounts.len(),
            entries: tables.entries.len(),
            transfers: tables.transfers.len(),
        }
    }

    /// Check the ledger and transfer invariants over committed data.
    ///
    /// Returns one message per violation; empty means consistent.
    pub fn audit(&self) -> Vec<String> {
        let tables = self.inner.tables();
        let mut violations = Vec::new();

        let mut sums: HashMap<i64, i64> = HashMap::new();
        for entry in tables.entries.values() {
            let sum = sums.entry(entry.account_id).or_default();
            *sum = sum.wrapping_add(entry.amount);
        }
        for account in tables.accounts.values() {
            let baseline = tables.baseline.get(&account.id).copied().unwrap_or(0);
            let sum = sums.get(&account.id).copied().unwrap_or(0);
            // Modular, so extreme admin overwrites still balance out.
            if baseline.wrapping_add(sum) != account.balance {
                violations.push(format!(
                    "account {}: balance {} != baseline {} + entries {}",
                    account.id, account.balance, baseline, sum
                ));
            }
        }

        // Pair every transfer with one debit and one credit entry.
        let mut unmatched: HashMap<(i64, i64), usize> = HashMap::new();
        for entry in tables.entries.values() {
            *unmatched.entry((entry.account_id, entry.amount)).or_default() += 1;
        }
        for transfer in tables.transfers.values() {
            for key in [
                (transfer.from_account_id, -transfer.amount),
                (transfer.to_account_id, transfer.amount),
            ] {
                match unmatched.get_mut(&key) {
                    Some(n) if *n > 0 => *n -= 1,
                    _ => violations.push(format!(
                        "transfer {}: missing entry {{account={}, amount={}}}",
                        transfer.id, key.0, key.1
                    )),
                }
            }
        }
        for ((account_id, amount), n) in unmatched {
            if n > 0 {
                violations.push(format!(
                    "{} entries {{account={}, amount={}}} without a transfer",
                    n, account_id, amount
                ));
            }
        }

        violations
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, LedgerError> {
        self.inner.take_fault(FaultPoint::Begin)?;
        Ok(Box::new(MemoryUnitOfWork {
            inner: Arc::clone(&self.inner),
            users: self.users.clone(),
            held: HashMap::new(),
            accounts: BTreeMap::new(),
            entries: BTreeMap::new(),
            transfers: BTreeMap::new(),
            baseline_shift: HashMap::new(),
            finished: false,
        }))
    }

    async fn health_check(&self) -> Result<(), LedgerError> {
        Ok(())
    }
}

/// Unit of work over [`MemoryLedger`]
pub struct MemoryUnitOfWork {
    inner: Arc<Inner>,
    users: Option<Arc<dyn UserRepository>>,
    held: HashMap<i64, OwnedMutexGuard<()>>,
    /// Staged account rows; `None` marks a deletion
    accounts: BTreeMap<i64, Option<Account>>,
    entries: BTreeMap<i64, Entry>,
    transfers: BTreeMap<i64, Transfer>,
    /// Balance changes not backed by entries, folded into the audit baseline
    baseline_shift: HashMap<i64, i64>,
    finished: bool,
}

impl MemoryUnitOfWork {
    async fn lock_row(&mut self, id: i64) {
        if self.held.contains_key(&id) {
            return;
        }
        let row = Arc::clone(self.inner.row_locks.entry(id).or_default().value());
        let guard = row.lock_owned().await;
        let delay = self.inner.lock_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.held.insert(id, guard);
    }

    fn visible_account(&self, id: i64) -> Option<Account> {
        match self.accounts.get(&id) {
            Some(staged) => staged.clone(),
            None => self.inner.tables().accounts.get(&id).cloned(),
        }
    }

    fn visible_accounts(&self) -> Vec<Account> {
        let mut merged: BTreeMap<i64, Account> = self.inner.tables().accounts.clone();
        for (id, staged) in &self.accounts {
            match staged {
                Some(account) => {
                    merged.insert(*id, account.clone());
                }
                None => {
                    merged.remove(id);
                }
            }
        }
        merged.into_values().collect()
    }

    fn require_account(&self, id: i64) -> Result<Account, LedgerError> {
        self.visible_account(id)
            .ok_or_else(|| LedgerError::account_not_found(id))
    }

    fn is_referenced(&self, account_id: i64) -> bool {
        let touches = |t: &Transfer| t.from_account_id == account_id || t.to_account_id == account_id;
        if self.entries.values().any(|e| e.account_id == account_id)
            || self.transfers.values().any(touches)
        {
            return true;
        }
        let tables = self.inner.tables();
        tables.entries.values().any(|e| e.account_id == account_id)
            || tables.transfers.values().any(touches)
    }

    /// Re-check constraints against committed data and apply staged writes.
    fn apply(&mut self) -> Result<(), LedgerError> {
        let mut tables = self.inner.tables();

        let mut final_accounts = tables.accounts.clone();
        for (id, staged) in &self.accounts {
            match staged {
                Some(account) => {
                    final_accounts.insert(*id, account.clone());
                }
                None => {
                    final_accounts.remove(id);
                }
            }
        }

        for (id, staged) in &self.accounts {
            let Some(account) = staged else { continue };
            if tables.accounts.contains_key(id) {
                continue;
            }
            let duplicate = final_accounts.values().any(|other| {
                other.id != *id && other.owner == account.owner && other.currency == account.currency
            });
            if duplicate {
                return Err(LedgerError::Conflict(format!(
                    "account for owner {} in {} already exists",
                    account.owner, account.currency
                )));
            }
        }

        for entry in self.entries.values() {
            if !final_accounts.contains_key(&entry.account_id) {
                return Err(LedgerError::account_not_found(entry.account_id));
            }
        }
        for transfer in self.transfers.values() {
            for id in [transfer.from_account_id, transfer.to_account_id] {
                if !final_accounts.contains_key(&id) {
                    return Err(LedgerError::account_not_found(id));
                }
            }
        }
        for (id, staged) in &self.accounts {
            if staged.is_none()
                && (tables.entries.values().any(|e| e.account_id == *id)
                    || tables
                        .transfers
                        .values()
                        .any(|t| t.from_account_id == *id || t.to_account_id == *id))
            {
                return Err(LedgerError::Conflict(format!(
                    "account {} is still referenced by ledger history",
                    id
                )));
            }
        }

        for (id, shift) in std::mem::take(&mut self.baseline_shift) {
            let baseline = tables.baseline.entry(id).or_default();
            *baseline = baseline.wrapping_add(shift);
        }
        for (id, staged) in std::mem::take(&mut self.accounts) {
            match staged {
                Some(account) => {
                    tables.accounts.insert(id, account);
                }
                None => {
                    tables.accounts.remove(&id);
                    tables.baseline.remove(&id);
                }
            }
        }
        tables.entries.append(&mut self.entries);
        tables.transfers.append(&mut self.transfers);
        Ok(())
    }

    fn page<T>(rows: impl Iterator<Item = T>, limit: i64, offset: i64) -> Vec<T> {
        rows.skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect()
    }
}

impl Drop for MemoryUnitOfWork {
    fn drop(&mut self) {
        if !self.finished {
            debug!(
                locks = self.held.len(),
                "Unit of work dropped without commit, rolled back"
            );
        }
    }
}

#[async_trait]
impl AccountRepository for MemoryUnitOfWork {
    async fn create_account(
        &mut self,
        params: CreateAccountParams,
    ) -> Result<Account, LedgerError> {
        if let Some(users) = self.users.clone() {
            users
                .get_user(&params.owner)
                .await
                .map_err(|e| owner_error(&params.owner, e))?;
        }

        let duplicate = self
            .visible_accounts()
            .iter()
            .any(|a| a.owner == params.owner && a.currency == params.currency);
        if duplicate {
            return Err(LedgerError::Conflict(format!(
                "account for owner {} in {} already exists",
                params.owner, params.currency
            )));
        }

        let account = Account {
            id: self.inner.account_seq.fetch_add(1, Ordering::SeqCst),
            owner: params.owner,
            balance: params.balance,
            currency: params.currency,
            created_at: Utc::now(),
        };
        self.accounts.insert(account.id, Some(account.clone()));
        self.baseline_shift.insert(account.id, account.balance);
        Ok(account)
    }

    async fn get_account(&mut self, id: i64) -> Result<Account, LedgerError> {
        self.require_account(id)
    }

    async fn list_accounts(
        &mut self,
        params: ListAccountsParams,
    ) -> Result<Vec<Account>, LedgerError> {
        let rows = self
            .visible_accounts()
            .into_iter()
            .filter(|a| params.owner.as_ref().is_none_or(|owner| &a.owner == owner));
        Ok(Self::page(rows, params.limit, params.offset))
    }

    async fn add_account_balance(&mut self, id: i64, delta: i64) -> Result<Account, LedgerError> {
        self.inner.take_fault(FaultPoint::AddBalance)?;
        self.lock_row(id).await;

        let mut account = self.require_account(id)?;
        account.balance = account.balance.checked_add(delta).ok_or_else(|| {
            LedgerError::InvalidArgument(format!("balance overflow on account {}", id))
        })?;
        self.accounts.insert(id, Some(account.clone()));
        Ok(account)
    }

    async fn set_account_balance(
        &mut self,
        id: i64,
        balance: i64,
    ) -> Result<Account, LedgerError> {
        self.lock_row(id).await;

        let mut account = self.require_account(id)?;
        let shift = balance.checked_sub(account.balance).ok_or_else(|| {
            LedgerError::InvalidArgument(format!("balance overflow on account {}", id))
        })?;
        account.balance = balance;
        self.accounts.insert(id, Some(account.clone()));
        let staged = self.baseline_shift.entry(id).or_default();
        *staged = staged.wrapping_add(shift);
        Ok(account)
    }

    async fn delete_account(&mut self, id: i64) -> Result<(), LedgerError> {
        self.lock_row(id).await;

        self.require_account(id)?;
        if self.is_referenced(id) {
            return Err(LedgerError::Conflict(format!(
                "account {} is still referenced by ledger history",
                id
            )));
        }
        self.accounts.insert(id, None);
        Ok(())
    }
}

#[async_trait]
impl EntryRepository for MemoryUnitOfWork {
    async fn create_entry(&mut self, params: CreateEntryParams) -> Result<Entry, LedgerError> {
        self.inner.take_fault(FaultPoint::InsertEntry)?;
        self.require_account(params.account_id)?;

        let entry = Entry {
            id: self.inner.entry_seq.fetch_add(1, Ordering::SeqCst),
            account_id: params.account_id,
            amount: params.amount,
            created_at: Utc::now(),
        };
        self.entries.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn get_entry(&mut self, id: i64) -> Result<Entry, LedgerError> {
        if let Some(entry) = self.entries.get(&id) {
            return Ok(entry.clone());
        }
        self.inner
            .tables()
            .entries
            .get(&id)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(format!("entry {} not found", id)))
    }

    async fn list_entries(
        &mut self,
        params: ListEntriesParams,
    ) -> Result<Vec<Entry>, LedgerError> {
        let mut merged = self.inner.tables().entries.clone();
        merged.extend(self.entries.iter().map(|(id, e)| (*id, e.clone())));
        let rows = merged
            .into_values()
            .filter(|e| e.account_id == params.account_id);
        Ok(Self::page(rows, params.limit, params.offset))
    }
}

#[async_trait]
impl TransferRepository for MemoryUnitOfWork {
    async fn create_transfer(
        &mut self,
        params: CreateTransferParams,
    ) -> Result<Transfer, LedgerError> {
        self.inner.take_fault(FaultPoint::InsertTransfer)?;
        self.require_account(params.from_account_id)?;
        self.require_account(params.to_account_id)?;

        let transfer = Transfer {
            id: self.inner.transfer_seq.fetch_add(1, Ordering::SeqCst),
            from_account_id: params.from_account_id,
            to_account_id: params.to_account_id,
            amount: params.amount,
            created_at: Utc::now(),
        };
        self.transfers.insert(transfer.id, transfer.clone());
        Ok(transfer)
    }

    async fn get_transfer(&mut self, id: i64) -> Result<Transfer, LedgerError> {
        if let Some(transfer) = self.transfers.get(&id) {
            return Ok(transfer.clone());
        }
        self.inner
            .tables()
            .transfers
            .get(&id)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(format!("transfer {} not found", id)))
    }

    async fn list_transfers(
        &mut self,
        params: ListTransfersParams,
    ) -> Result<Vec<Transfer>, LedgerError> {
        let mut merged = self.inner.tables().transfers.clone();
        merged.extend(self.transfers.iter().map(|(id, t)| (*id, t.clone())));
        let rows = merged.into_values().filter(|t| {
            t.from_account_id == params.from_account_id || t.to_account_id == params.to_account_id
        });
        Ok(Self::page(rows, params.limit, params.offset))
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<(), LedgerError> {
        let mut this = self;
        this.finished = true;
        this.inner.take_fault(FaultPoint::Commit)?;
        // Row locks are released when `this` drops, after the writes landed.
        this.apply()
    }

    async fn rollback(self: Box<Self>) -> Result<(), LedgerError> {
        let mut this = self;
        this.finished = true;
        Ok(())
    }
}

fn owner_error(owner: &str, err: UserError) -> LedgerError {
    match err {
        UserError::NotFound(_) => {
            LedgerError::NotFound(format!("referenced user {} not found", owner))
        }
        UserError::ServiceUnavailable(m) => LedgerError::Unavailable(m),
        other => LedgerError::Internal(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::error::ErrorKind;
    use crate::ledger::models::Currency;

    fn params(owner: &str, balance: i64, currency: Currency) -> CreateAccountParams {
        CreateAccountParams {
            owner: owner.to_string(),
            balance,
            currency,
        }
    }

    async fn seed(store: &MemoryLedger, owner: &str, balance: i64) -> Account {
        let mut uow = store.begin().await.unwrap();
        let account = uow
            .create_account(params(owner, balance, Currency::Usd))
            .await
            .unwrap();
        uow.commit().await.unwrap();
        account
    }

    #[tokio::test]
    async fn test_staged_writes_invisible_until_commit() {
        let store = MemoryLedger::new();
        let account = seed(&store, "alice", 100).await;

        let mut writer = store.begin().await.unwrap();
        writer.add_account_balance(account.id, 50).await.unwrap();

        let mut reader = store.begin().await.unwrap();
        assert_eq!(reader.get_account(account.id).await.unwrap().balance, 100);
        assert_eq!(writer.get_account(account.id).await.unwrap().balance, 150);

        writer.commit().await.unwrap();
        assert_eq!(reader.get_account(account.id).await.unwrap().balance, 150);
    }

    #[tokio::test]
    async fn test_drop_rolls_back_and_releases_lock() {
        let store = MemoryLedger::new();
        let account = seed(&store, "alice", 100).await;

        {
            let mut uow = store.begin().await.unwrap();
            uow.add_account_balance(account.id, -40).await.unwrap();
            uow.create_entry(CreateEntryParams {
                account_id: account.id,
                amount: -40,
            })
            .await
            .unwrap();
        }

        let mut uow = store.begin().await.unwrap();
        let fresh = tokio::time::timeout(
            Duration::from_secs(1),
            uow.add_account_balance(account.id, 0),
        )
        .await
        .expect("row lock should be released by drop")
        .unwrap();
        assert_eq!(fresh.balance, 100);
        assert_eq!(store.counts().entries, 0);
    }

    #[tokio::test]
    async fn test_row_lock_serializes_writers() {
        let store = MemoryLedger::new();
        let account = seed(&store, "alice", 0).await;

        let mut first = store.begin().await.unwrap();
        first.add_account_balance(account.id, 10).await.unwrap();

        let second_store = store.clone();
        let id = account.id;
        let second = tokio::spawn(async move {
            let mut uow = second_store.begin().await.unwrap();
            let updated = uow.add_account_balance(id, 5).await.unwrap();
            uow.commit().await.unwrap();
            updated.balance
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!second.is_finished(), "second writer must wait for the row lock");

        first.commit().await.unwrap();
        assert_eq!(second.await.unwrap(), 15);
    }

    #[tokio::test]
    async fn test_owner_currency_unique() {
        let store = MemoryLedger::new();
        seed(&store, "alice", 0).await;

        let mut uow = store.begin().await.unwrap();
        let err = uow
            .create_account(params("alice", 10, Currency::Usd))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        uow.create_account(params("alice", 10, Currency::Eur))
            .await
            .unwrap();
        uow.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_create_rejected_at_commit() {
        let store = MemoryLedger::new();

        let mut a = store.begin().await.unwrap();
        let mut b = store.begin().await.unwrap();
        a.create_account(params("bob", 0, Currency::Pln)).await.unwrap();
        b.create_account(params("bob", 0, Currency::Pln)).await.unwrap();

        a.commit().await.unwrap();
        let err = b.commit().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(store.counts().accounts, 1);
    }

    #[tokio::test]
    async fn test_entry_requires_existing_account() {
        let store = MemoryLedger::new();
        let mut uow = store.begin().await.unwrap();
        let err = uow
            .create_entry(CreateEntryParams {
                account_id: 42,
                amount: 1,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_delete_blocked_by_history() {
        let store = MemoryLedger::new();
        let a = seed(&store, "alice", 0).await;
        let b = seed(&store, "bob", 0).await;

        let mut uow = store.begin().await.unwrap();
        uow.create_entry(CreateEntryParams {
            account_id: a.id,
            amount: 5,
        })
        .await
        .unwrap();
        uow.add_account_balance(a.id, 5).await.unwrap();
        uow.commit().await.unwrap();

        let mut uow = store.begin().await.unwrap();
        let err = uow.delete_account(a.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        uow.delete_account(b.id).await.unwrap();
        uow.commit().await.unwrap();

        let mut uow = store.begin().await.unwrap();
        let err = uow.get_account(b.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = uow.delete_account(b.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_fault_after_skip() {
        let store = MemoryLedger::new();
        let a = seed(&store, "alice", 0).await;
        store.inject_fault_after(
            FaultPoint::InsertEntry,
            1,
            LedgerError::Internal("disk full".into()),
        );

        let mut uow = store.begin().await.unwrap();
        let entry = CreateEntryParams {
            account_id: a.id,
            amount: 1,
        };
        assert!(uow.create_entry(entry.clone()).await.is_ok());
        let err = uow.create_entry(entry.clone()).await.unwrap_err();
        assert_eq!(err, LedgerError::Internal("disk full".into()));
        assert!(uow.create_entry(entry).await.is_ok());
    }

    #[tokio::test]
    async fn test_list_accounts_pages_by_id() {
        let store = MemoryLedger::new();
        for i in 0..10 {
            seed(&store, &format!("owner{}", i), i).await;
        }

        let mut uow = store.begin().await.unwrap();
        let page = uow
            .list_accounts(ListAccountsParams {
                owner: None,
                limit: 5,
                offset: 5,
            })
            .await
            .unwrap();
        assert_eq!(page.len(), 5);
        assert!(page.windows(2).all(|w| w[0].id < w[1].id));
        assert_eq!(page[0].owner, "owner5");

        let mine = uow
            .list_accounts(ListAccountsParams {
                owner: Some("owner3".into()),
                limit: 5,
                offset: 0,
            })
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
    }

    #[tokio::test]
    async fn test_audit_flags_unpaired_entry() {
        let store = MemoryLedger::new();
        let a = seed(&store, "alice", 100).await;
        assert!(store.audit().is_empty());

        let mut uow = store.begin().await.unwrap();
        uow.create_entry(CreateEntryParams {
            account_id: a.id,
            amount: 7,
        })
        .await
        .unwrap();
        uow.commit().await.unwrap();

        let violations = store.audit();
        assert_eq!(violations.len(), 2, "{:?}", violations);
    }

    #[tokio::test]
    async fn test_set_balance_overflow_is_rejected() {
        let store = MemoryLedger::new();
        let account = seed(&store, "alice", -10).await;

        let mut uow = store.begin().await.unwrap();
        let err = uow.set_account_balance(account.id, i64::MAX).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        uow.rollback().await.unwrap();

        let mut uow = store.begin().await.unwrap();
        uow.set_account_balance(account.id, i64::MIN + 1).await.unwrap();
        uow.commit().await.unwrap();
        assert!(store.audit().is_empty(), "{:?}", store.audit());
    }

    #[tokio::test]
    async fn test_owner_must_exist_when_users_attached() {
        use crate::user_auth::{MemoryUserRepository, models::CreateUserParams};

        let users = Arc::new(MemoryUserRepository::new());
        users
            .create_user(CreateUserParams {
                username: "alice".to_string(),
                hashed_password: "x".to_string(),
                full_name: "Alice".to_string(),
                email: "alice@example.com".to_string(),
            })
            .await
            .unwrap();
        let store = MemoryLedger::new().with_users(users);

        let mut uow = store.begin().await.unwrap();
        let err = uow
            .create_account(params("ghost", 0, Currency::Usd))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        uow.create_account(params("alice", 0, Currency::Usd))
            .await
            .unwrap();
        uow.commit().await.unwrap();
        assert_eq!(store.counts().accounts, 1);
    }
}
